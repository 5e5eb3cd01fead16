//! Error handling for the myoflow framework
//!
//! One error type shared by every crate in the workspace. Configuration and
//! state violations are surfaced synchronously to the caller; source
//! failures stop the acquisition loop and are reported to its owner.

use core::fmt;

/// Result type alias for myoflow operations
pub type MyoResult<T> = Result<T, MyoError>;

/// Error type for all myoflow operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MyoError {
    /// Invalid configuration (non-positive window step, channel-count
    /// mismatch, bad frequency, ...)
    Configuration {
        /// Description of the configuration error
        reason: String,
    },

    /// The external data source failed or timed out during a pull
    SourceFailure {
        /// Description of the failure
        reason: String,
    },

    /// Operation called out of sequence (e.g. session tick before start)
    State {
        /// Description of the sequencing violation
        reason: String,
    },

    /// Programmer error that would desynchronize training and inference
    /// (stage-order divergence, filter state shared across channels)
    Consistency {
        /// Description of the inconsistency
        reason: String,
    },

    /// Record sink failed to accept or flush a row
    Sink {
        /// Description of the sink failure
        reason: String,
    },
}

impl MyoError {
    /// Configuration error from anything displayable
    pub fn config(reason: impl Into<String>) -> Self {
        MyoError::Configuration { reason: reason.into() }
    }

    /// State error from anything displayable
    pub fn state(reason: impl Into<String>) -> Self {
        MyoError::State { reason: reason.into() }
    }
}

impl fmt::Display for MyoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MyoError::Configuration { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            MyoError::SourceFailure { reason } => {
                write!(f, "Data source failure: {}", reason)
            }
            MyoError::State { reason } => {
                write!(f, "Invalid state: {}", reason)
            }
            MyoError::Consistency { reason } => {
                write!(f, "Consistency violation: {}", reason)
            }
            MyoError::Sink { reason } => {
                write!(f, "Record sink failure: {}", reason)
            }
        }
    }
}

impl std::error::Error for MyoError {}

impl From<std::io::Error> for MyoError {
    fn from(err: std::io::Error) -> Self {
        MyoError::Sink { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MyoError::Configuration {
            reason: "window overlap 10 >= window size 10".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Invalid configuration"));
        assert!(display.contains("window overlap"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = MyoError::state("tick before start");
        let error2 = MyoError::state("tick before start");
        assert_eq!(error1, error2);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: MyoError = io.into();
        assert!(matches!(err, MyoError::Sink { .. }));
    }
}
