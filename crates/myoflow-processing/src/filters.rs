//! Digital filters applied sample-by-sample per channel
//!
//! Every filter instance carries the recursion state for exactly one
//! channel. Instances must never be shared across channels; the pipeline
//! builds one per channel from a `FilterSpec`.

use myoflow_core::{MyoError, MyoResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::{PI, SQRT_2};

/// One stateful single-channel filter.
///
/// `process` must be called exactly once per incoming sample, in arrival
/// order; skipping or reordering samples corrupts the recursion state.
pub trait ChannelFilter: Send {
    /// Filter one sample, advancing internal state
    fn process(&mut self, input: f64) -> f64;

    /// Zero the internal state
    fn reset(&mut self);
}

/// Declarative filter description, turned into a stateful instance per
/// channel by `FilterSpec::build`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterSpec {
    /// 2nd-order Butterworth lowpass
    Lowpass { cutoff_hz: f64 },
    /// 2nd-order Butterworth highpass
    Highpass { cutoff_hz: f64 },
    /// Biquad notch for powerline interference
    Notch { freq_hz: f64, q: f64 },
    /// Simple moving average
    MovingAverage { window: usize },
}

impl FilterSpec {
    /// Instantiate the filter for one channel at the given sampling rate
    pub fn build(&self, sampling_rate_hz: f64) -> MyoResult<Box<dyn ChannelFilter>> {
        match *self {
            FilterSpec::Lowpass { cutoff_hz } => {
                Ok(Box::new(Biquad::lowpass(cutoff_hz, sampling_rate_hz)?))
            }
            FilterSpec::Highpass { cutoff_hz } => {
                Ok(Box::new(Biquad::highpass(cutoff_hz, sampling_rate_hz)?))
            }
            FilterSpec::Notch { freq_hz, q } => {
                Ok(Box::new(Biquad::notch(freq_hz, q, sampling_rate_hz)?))
            }
            FilterSpec::MovingAverage { window } => {
                Ok(Box::new(MovingAverage::new(window)?))
            }
        }
    }
}

/// Single biquad section (2nd order) for one channel
#[derive(Debug, Clone)]
pub struct Biquad {
    // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn from_coeffs(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Biquad {
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn check_cutoff(cutoff_hz: f64, fs: f64) -> MyoResult<()> {
        if cutoff_hz <= 0.0 || cutoff_hz >= fs / 2.0 {
            return Err(MyoError::Configuration {
                reason: format!(
                    "cutoff {}Hz must lie between 0 and Nyquist ({}Hz)",
                    cutoff_hz,
                    fs / 2.0
                ),
            });
        }
        Ok(())
    }

    /// 2nd-order Butterworth lowpass via bilinear transform
    pub fn lowpass(cutoff_hz: f64, fs: f64) -> MyoResult<Self> {
        Self::check_cutoff(cutoff_hz, fs)?;

        let omega_c = 2.0 * PI * cutoff_hz / fs;
        let k = (omega_c / 2.0).tan();
        let k2 = k * k;
        let norm = k2 + SQRT_2 * k + 1.0;

        let b0 = k2 / norm;
        Ok(Self::from_coeffs(
            b0,
            2.0 * b0,
            b0,
            2.0 * (k2 - 1.0) / norm,
            (k2 - SQRT_2 * k + 1.0) / norm,
        ))
    }

    /// 2nd-order Butterworth highpass via bilinear transform
    pub fn highpass(cutoff_hz: f64, fs: f64) -> MyoResult<Self> {
        Self::check_cutoff(cutoff_hz, fs)?;

        let omega_c = 2.0 * PI * cutoff_hz / fs;
        let k = (omega_c / 2.0).tan();
        let k2 = k * k;
        let norm = k2 + SQRT_2 * k + 1.0;

        let b0 = 1.0 / norm;
        Ok(Self::from_coeffs(
            b0,
            -2.0 * b0,
            b0,
            2.0 * (k2 - 1.0) / norm,
            (k2 - SQRT_2 * k + 1.0) / norm,
        ))
    }

    /// Biquad notch centered on `freq_hz` with quality factor `q`
    pub fn notch(freq_hz: f64, q: f64, fs: f64) -> MyoResult<Self> {
        Self::check_cutoff(freq_hz, fs)?;
        if q <= 0.0 {
            return Err(MyoError::config("notch quality factor must be positive"));
        }

        let omega = 2.0 * PI * freq_hz / fs;
        let alpha = omega.sin() / (2.0 * q);
        let cos_omega = omega.cos();
        let a0 = 1.0 + alpha;

        Ok(Self::from_coeffs(
            1.0 / a0,
            -2.0 * cos_omega / a0,
            1.0 / a0,
            -2.0 * cos_omega / a0,
            (1.0 - alpha) / a0,
        ))
    }
}

impl ChannelFilter for Biquad {
    fn process(&mut self, input: f64) -> f64 {
        // Direct form I
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Moving average over the most recent `window` samples of one channel
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    buffer: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> MyoResult<Self> {
        if window == 0 {
            return Err(MyoError::config("moving-average window must be positive"));
        }
        Ok(MovingAverage {
            window,
            buffer: VecDeque::with_capacity(window),
            sum: 0.0,
        })
    }
}

impl ChannelFilter for MovingAverage {
    fn process(&mut self, input: f64) -> f64 {
        self.buffer.push_back(input);
        self.sum += input;

        if self.buffer.len() > self.window {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old;
            }
        }

        self.sum / self.buffer.len() as f64
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }
}
