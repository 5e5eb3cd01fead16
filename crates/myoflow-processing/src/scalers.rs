//! Stateless value scalers parameterized by frozen per-channel statistics

use myoflow_core::ChannelStats;
use serde::{Deserialize, Serialize};

/// Pure scaling functions. The statistics are computed once from
/// calibration data (`ChannelStats::from_series`) and never recomputed
/// mid-stream; training and inference must see the same mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerKind {
    /// `(x - min) / (max - min) - 0.5`, unchanged when `max == min`
    MinMaxZeroCenter,
    /// `x - mean`
    ZeroCenter,
    /// `(x - mean) / std_dev`, unchanged when `std_dev == 0`
    Standardize,
}

impl ScalerKind {
    /// Scale one value with the channel's frozen statistics
    pub fn apply(&self, value: f64, stats: &ChannelStats) -> f64 {
        match self {
            ScalerKind::MinMaxZeroCenter => {
                if stats.max == stats.min {
                    value
                } else {
                    (value - stats.min) / (stats.max - stats.min) - 0.5
                }
            }
            ScalerKind::ZeroCenter => value - stats.mean,
            ScalerKind::Standardize => {
                if stats.std_dev == 0.0 {
                    value
                } else {
                    (value - stats.mean) / stats.std_dev
                }
            }
        }
    }
}
