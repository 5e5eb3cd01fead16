//! Muscle activation patterns driving the synthetic signal

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Activation envelope as a function of time, in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ActivationPattern {
    /// Constant activation level
    Constant { level: f64 },
    /// Sinusoidal contraction cycle
    Sinusoidal {
        frequency_hz: f64,
        amplitude: f64,
        baseline: f64,
    },
    /// Linear ramp, holding the end level afterwards
    Ramp {
        start_level: f64,
        end_level: f64,
        duration_s: f64,
    },
    /// On/off contraction cycles
    Burst {
        on_duration_s: f64,
        off_duration_s: f64,
        amplitude: f64,
    },
}

impl ActivationPattern {
    /// Activation level at the given time in seconds
    pub fn level_at(&self, time_s: f64) -> f64 {
        match self {
            ActivationPattern::Constant { level } => *level,

            ActivationPattern::Sinusoidal { frequency_hz, amplitude, baseline } => {
                baseline + amplitude * (2.0 * PI * frequency_hz * time_s).sin()
            }

            ActivationPattern::Ramp { start_level, end_level, duration_s } => {
                if time_s >= *duration_s {
                    *end_level
                } else {
                    start_level + (end_level - start_level) * (time_s / duration_s)
                }
            }

            ActivationPattern::Burst { on_duration_s, off_duration_s, amplitude } => {
                let cycle = on_duration_s + off_duration_s;
                if time_s % cycle < *on_duration_s {
                    *amplitude
                } else {
                    0.0
                }
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActivationPattern::Constant { .. } => "Constant activation",
            ActivationPattern::Sinusoidal { .. } => "Sinusoidal contraction",
            ActivationPattern::Ramp { .. } => "Gradual ramp",
            ActivationPattern::Burst { .. } => "Burst cycles",
        }
    }
}

impl Default for ActivationPattern {
    fn default() -> Self {
        ActivationPattern::Constant { level: 0.3 }
    }
}
