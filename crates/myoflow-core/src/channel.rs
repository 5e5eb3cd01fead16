//! Channel model: type tags, activity flags and scaling statistics

use serde::{Deserialize, Serialize};

/// Channel classification, selecting which pipeline stage list applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Generic sensor channel (IMU, force, ...)
    Generic,
    /// Electromyography channel, filtered and scaled separately
    Emg,
}

/// Per-channel scaling statistics, computed once from calibration data and
/// frozen for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl ChannelStats {
    /// Compute statistics from a calibration series
    pub fn from_series(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self::default();
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self { min: 0.0, max: 0.0, mean: 0.0, std_dev: 0.0 }
    }
}

/// Static configuration of one input channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    /// Inactive channels pass through filtering/scaling unmodified and
    /// contribute zero features
    pub active: bool,
    pub stats: ChannelStats,
}

impl ChannelConfig {
    pub fn generic() -> Self {
        Self {
            kind: ChannelKind::Generic,
            active: true,
            stats: ChannelStats::default(),
        }
    }

    pub fn emg(stats: ChannelStats) -> Self {
        Self {
            kind: ChannelKind::Emg,
            active: true,
            stats,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
