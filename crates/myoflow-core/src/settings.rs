//! Session settings: immutable configuration loaded before a session starts

use crate::channel::ChannelConfig;
use crate::error::{MyoError, MyoResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one acquisition/training/scoring session.
///
/// Loaded once (typically from JSON) and treated as immutable input for the
/// lifetime of the session; the realtime path never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Per-channel type/active flags and scaling statistics, in fixed
    /// channel order
    pub channels: Vec<ChannelConfig>,
    /// Acquisition frequency in Hz
    pub frequency_hz: u32,
    /// Window length in samples
    pub window_size: usize,
    /// Overlap between consecutive windows, in samples
    pub window_overlap: usize,
    /// Number of windows held in the realtime history span
    pub window_count: usize,
    /// Output class labels; index is the class id
    pub output_labels: Vec<String>,
    /// Unrecorded rest portion of each class segment, milliseconds
    pub relax_time_ms: i64,
    /// Recorded contraction portion of each class segment, milliseconds
    pub contraction_time_ms: i64,
    /// Number of repetition cycles over all classes
    pub collection_cycles: u32,
}

impl SessionSettings {
    /// Number of configured channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of output classes
    pub fn output_count(&self) -> usize {
        self.output_labels.len()
    }

    /// Window advance step in samples
    pub fn window_step(&self) -> usize {
        self.window_size - self.window_overlap
    }

    /// Samples held per channel by the realtime history buffer:
    /// `window_size + (window_size - window_overlap) * (window_count - 1)`
    pub fn history_len(&self) -> usize {
        self.window_size + self.window_step() * (self.window_count - 1)
    }

    /// Tick period in milliseconds
    pub fn period_ms(&self) -> f64 {
        1000.0 / self.frequency_hz as f64
    }

    /// Validate the settings before starting a session
    pub fn validate(&self) -> MyoResult<()> {
        if self.channels.is_empty() {
            return Err(MyoError::config("at least one channel is required"));
        }
        if self.frequency_hz == 0 {
            return Err(MyoError::config("acquisition frequency must be positive"));
        }
        // Sample timestamps carry microsecond resolution, so periods
        // below a microsecond cannot be represented.
        if self.frequency_hz > 1_000_000 {
            return Err(MyoError::config("acquisition frequency above 1 MHz is not supported"));
        }
        if self.window_size == 0 {
            return Err(MyoError::config("window size must be positive"));
        }
        if self.window_overlap >= self.window_size {
            return Err(MyoError::Configuration {
                reason: format!(
                    "window overlap {} must be smaller than window size {}",
                    self.window_overlap, self.window_size
                ),
            });
        }
        if self.window_count == 0 {
            return Err(MyoError::config("window count must be positive"));
        }
        if self.output_labels.is_empty() {
            return Err(MyoError::config("at least one output label is required"));
        }
        if self.relax_time_ms < 0 || self.contraction_time_ms <= 0 {
            return Err(MyoError::config(
                "relax time must be non-negative and contraction time positive",
            ));
        }
        if self.collection_cycles == 0 {
            return Err(MyoError::config("collection cycles must be positive"));
        }
        Ok(())
    }

    /// Load settings from a JSON file and validate them
    pub fn load(path: impl AsRef<Path>) -> MyoResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MyoError::config(format!("cannot read settings: {}", e)))?;
        let settings: SessionSettings = serde_json::from_str(&text)
            .map_err(|e| MyoError::config(format!("cannot parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> MyoResult<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| MyoError::config(format!("cannot serialize settings: {}", e)))?;
        std::fs::write(path, text)
            .map_err(|e| MyoError::config(format!("cannot write settings: {}", e)))?;
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            channels: vec![ChannelConfig::generic(); 4],
            frequency_hz: 100,
            window_size: 50,
            window_overlap: 25,
            window_count: 4,
            output_labels: vec!["rest".to_string(), "open".to_string(), "close".to_string()],
            relax_time_ms: 1000,
            contraction_time_ms: 1000,
            collection_cycles: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        assert!(SessionSettings::default().validate().is_ok());
    }

    #[test]
    fn test_history_len() {
        let settings = SessionSettings {
            window_size: 50,
            window_overlap: 25,
            window_count: 4,
            ..Default::default()
        };
        // 50 + 25 * 3
        assert_eq!(settings.history_len(), 125);
        assert_eq!(settings.window_step(), 25);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let settings = SessionSettings {
            window_size: 10,
            window_overlap: 10,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(MyoError::Configuration { .. })
        ));
    }

    #[test]
    fn test_frequency_bounds() {
        let too_fast = SessionSettings {
            frequency_hz: 2_000_000,
            ..Default::default()
        };
        assert!(too_fast.validate().is_err());

        let zero = SessionSettings {
            frequency_hz: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_period_ms() {
        let settings = SessionSettings {
            frequency_hz: 100,
            ..Default::default()
        };
        assert!((settings.period_ms() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = SessionSettings::default();
        let text = serde_json::to_string(&settings).unwrap();
        let parsed: SessionSettings = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.channel_count(), settings.channel_count());
        assert_eq!(parsed.output_labels, settings.output_labels);
    }
}
