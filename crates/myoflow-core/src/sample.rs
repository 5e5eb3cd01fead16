//! Sample: one multi-channel acquisition tick

use crate::error::{MyoError, MyoResult};
use serde::{Deserialize, Serialize};

/// One vector of channel values produced by a single acquisition tick.
///
/// Immutable after creation. `timestamp_us` is microseconds since the
/// start of the acquisition run, taken from the monotonic clock driving
/// the loop. Microsecond resolution keeps timestamps strictly increasing
/// at sampling rates above 1 kHz, where whole milliseconds would collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    channels: Vec<f64>,
    timestamp_us: i64,
}

impl Sample {
    /// Create a new sample, validating the channel count
    pub fn new(channels: Vec<f64>, timestamp_us: i64, expected_channels: usize) -> MyoResult<Self> {
        if channels.len() != expected_channels {
            return Err(MyoError::Configuration {
                reason: format!(
                    "Sample has {} channels, settings expect {}",
                    channels.len(),
                    expected_channels
                ),
            });
        }
        Ok(Sample { channels, timestamp_us })
    }

    /// Sample without channel-count validation, for internal producers that
    /// have already sized the vector
    pub fn from_parts(channels: Vec<f64>, timestamp_us: i64) -> Self {
        Sample { channels, timestamp_us }
    }

    /// Number of channels in this sample
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Value for one channel
    pub fn channel(&self, index: usize) -> Option<f64> {
        self.channels.get(index).copied()
    }

    /// All channel values, in fixed channel order
    pub fn channels(&self) -> &[f64] {
        &self.channels
    }

    /// Microseconds since acquisition start
    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    /// Whole milliseconds since acquisition start, the resolution the
    /// training schedule and record rows use
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_us / 1000
    }
}
