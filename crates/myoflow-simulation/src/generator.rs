//! Seedable multi-channel synthetic EMG source

use crate::patterns::ActivationPattern;
use myoflow_core::{MyoError, MyoResult};
use myoflow_realtime::SampleSource;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Noise added on top of the clean pattern signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub gaussian_std: f64,
    /// Slow baseline drift amplitude
    pub baseline_wander: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig {
            gaussian_std: 0.05,
            baseline_wander: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub channel_count: usize,
    pub sampling_rate_hz: f64,
    pub pattern: ActivationPattern,
    pub noise: NoiseConfig,
    /// Mains interference frequency, if simulated
    pub powerline_hz: Option<f64>,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            channel_count: 4,
            sampling_rate_hz: 1000.0,
            pattern: ActivationPattern::default(),
            noise: NoiseConfig::default(),
            powerline_hz: Some(50.0),
            seed: None,
        }
    }
}

/// Generates one sample vector per pull, advancing an internal clock
/// by one sampling period each time
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: rand::rngs::StdRng,
    noise_dist: Normal<f64>,
    tick: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> MyoResult<Self> {
        if config.channel_count == 0 {
            return Err(MyoError::config("channel_count must be positive"));
        }
        if config.sampling_rate_hz <= 0.0 {
            return Err(MyoError::config("sampling_rate_hz must be positive"));
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        let rng = rand::rngs::StdRng::seed_from_u64(seed);
        let noise_dist = Normal::new(0.0, config.noise.gaussian_std).map_err(|e| {
            MyoError::config(format!("invalid noise configuration: {}", e))
        })?;

        Ok(SyntheticSource {
            config,
            rng,
            noise_dist,
            tick: 0,
        })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    pub fn set_pattern(&mut self, pattern: ActivationPattern) {
        self.config.pattern = pattern;
    }

    /// Rewind the internal clock without reseeding the noise
    pub fn reset_time(&mut self) {
        self.tick = 0;
    }

    fn sample_channel(&mut self, time_s: f64, channel: usize) -> f64 {
        let activation = self.config.pattern.level_at(time_s);
        let amplitude = activation * 2.0;

        // Firing frequency varies slightly per channel
        let base_hz = 80.0 + channel as f64 * 10.0;
        let omega = 2.0 * std::f64::consts::PI * base_hz * time_s;
        let mut value = amplitude * omega.sin();
        value += amplitude * 0.3 * (omega * 2.0).sin();
        value += amplitude * 0.1 * (omega * 3.0).sin();

        // Fiber recruitment jitter scales with activation
        value += activation * self.rng.gen_range(-0.2..0.2);

        value += self.noise_dist.sample(&mut self.rng);
        value += self.config.noise.baseline_wander
            * (2.0 * std::f64::consts::PI * 0.1 * time_s).sin();

        if let Some(mains) = self.config.powerline_hz {
            value += 0.05 * (2.0 * std::f64::consts::PI * mains * time_s).sin();
        }

        value.clamp(-5.0, 5.0)
    }
}

impl SampleSource for SyntheticSource {
    fn pull(&mut self) -> MyoResult<Vec<f64>> {
        let time_s = self.tick as f64 / self.config.sampling_rate_hz;
        self.tick += 1;

        let values = (0..self.config.channel_count)
            .map(|ch| self.sample_channel(time_s, ch))
            .collect();
        Ok(values)
    }
}
