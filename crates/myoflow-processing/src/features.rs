//! Windowed feature extraction
//!
//! Converts a channel's sample series into a shorter feature series: one
//! value per window of `window_size` samples, advanced by
//! `window_size - window_overlap`. With input length `L` the output holds
//! `floor((L - window_size) / step) + 1` values, or none when
//! `L < window_size`.

use myoflow_core::{MyoError, MyoResult};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Per-window reductions. The time-domain set matches the classic EMG
/// pattern-recognition features; the spectral pair is computed over an FFT
/// of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// First sample of the window, unreduced
    Raw,
    Mean,
    MeanAbsoluteValue,
    /// `Σx² / (window_size - 1)`
    Variance,
    /// Sign-flip count; zero counts as non-negative
    ZeroCrossings,
    /// Sign-flip count of the delta series (last delta duplicated so the
    /// delta series keeps the input length before windowing)
    SlopeSignChanges,
    /// `Σ|x[j] - x[j-1]|`
    WaveformLength,
    /// `Σ|x[j] - x[j-1]|` restricted to samples with `x[j] > threshold`
    WilsonAmplitude { threshold: f64 },
    /// Power-weighted mean of the window's spectrum, Hz
    MeanFrequency,
    /// Frequency splitting the window's spectral power in half, Hz
    MedianFrequency,
}

/// Windowed extractor; owns the FFT planner for the spectral kinds.
///
/// One instance serves every channel: the reductions are stateless, only
/// the planner caches twiddle factors.
pub struct FeatureExtractor {
    window_size: usize,
    window_overlap: usize,
    sampling_rate_hz: f64,
    planner: FftPlanner<f64>,
}

impl FeatureExtractor {
    pub fn new(
        window_size: usize,
        window_overlap: usize,
        sampling_rate_hz: f64,
    ) -> MyoResult<Self> {
        if window_size == 0 {
            return Err(MyoError::config("window size must be positive"));
        }
        if window_overlap >= window_size {
            return Err(MyoError::Configuration {
                reason: format!(
                    "window overlap {} must be smaller than window size {}",
                    window_overlap, window_size
                ),
            });
        }
        if sampling_rate_hz <= 0.0 {
            return Err(MyoError::config("sampling rate must be positive"));
        }

        Ok(FeatureExtractor {
            window_size,
            window_overlap,
            sampling_rate_hz,
            planner: FftPlanner::new(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Window advance in samples
    pub fn step(&self) -> usize {
        self.window_size - self.window_overlap
    }

    /// Number of windows produced from a series of length `len`
    pub fn output_len(&self, len: usize) -> usize {
        if len < self.window_size {
            0
        } else {
            (len - self.window_size) / self.step() + 1
        }
    }

    /// Reduce a series to its feature series for one kind.
    ///
    /// Returns an empty vector when the series is shorter than one window.
    pub fn compute(&mut self, kind: FeatureKind, series: &[f64]) -> MyoResult<Vec<f64>> {
        if series.len() < self.window_size {
            return Ok(Vec::new());
        }

        // Slope sign changes window the padded delta series instead of the
        // raw samples
        let deltas;
        let windowed: &[f64] = match kind {
            FeatureKind::SlopeSignChanges => {
                deltas = delta_series(series);
                &deltas
            }
            _ => series,
        };

        let step = self.step();
        let mut out = Vec::with_capacity(self.output_len(series.len()));
        let mut start = 0;
        while start + self.window_size <= windowed.len() {
            let window = &windowed[start..start + self.window_size];
            out.push(self.reduce(kind, window));
            start += step;
        }
        Ok(out)
    }

    fn reduce(&mut self, kind: FeatureKind, window: &[f64]) -> f64 {
        let n = window.len() as f64;
        match kind {
            FeatureKind::Raw => window[0],
            FeatureKind::Mean => window.iter().sum::<f64>() / n,
            FeatureKind::MeanAbsoluteValue => window.iter().map(|x| x.abs()).sum::<f64>() / n,
            FeatureKind::Variance => {
                window.iter().map(|x| x * x).sum::<f64>() / (n - 1.0)
            }
            FeatureKind::ZeroCrossings | FeatureKind::SlopeSignChanges => {
                sign_flips(window) as f64
            }
            FeatureKind::WaveformLength => window
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).abs())
                .sum(),
            FeatureKind::WilsonAmplitude { threshold } => window
                .windows(2)
                .filter(|pair| pair[1] > threshold)
                .map(|pair| (pair[1] - pair[0]).abs())
                .sum(),
            FeatureKind::MeanFrequency => self.spectral(window).0,
            FeatureKind::MedianFrequency => self.spectral(window).1,
        }
    }

    /// (mean frequency, median frequency) of one window
    fn spectral(&mut self, window: &[f64]) -> (f64, f64) {
        let fft_size = window.len().next_power_of_two();
        let fft = self.planner.plan_fft_forward(fft_size);

        let mut buffer: Vec<Complex<f64>> =
            window.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(fft_size, Complex::new(0.0, 0.0));
        fft.process(&mut buffer);

        let power: Vec<f64> = buffer[0..fft_size / 2]
            .iter()
            .map(|c| c.norm_sqr())
            .collect();
        let freq_resolution = self.sampling_rate_hz / fft_size as f64;

        // Mean frequency, DC excluded
        let mut weighted = 0.0;
        let mut total_ac = 0.0;
        for (i, &p) in power.iter().enumerate().skip(1) {
            weighted += i as f64 * freq_resolution * p;
            total_ac += p;
        }
        let mean_freq = if total_ac > 0.0 { weighted / total_ac } else { 0.0 };

        // Median frequency over the full spectrum power
        let total: f64 = power.iter().sum();
        let mut median_freq = 0.0;
        if total > 0.0 {
            let half = total / 2.0;
            let mut cumulative = 0.0;
            for (i, &p) in power.iter().enumerate() {
                cumulative += p;
                if cumulative >= half {
                    median_freq = i as f64 * freq_resolution;
                    break;
                }
            }
        }

        (mean_freq, median_freq)
    }
}

/// Delta series padded with its last element to preserve the input length
fn delta_series(series: &[f64]) -> Vec<f64> {
    if series.len() < 2 {
        return vec![0.0; series.len()];
    }
    let mut deltas: Vec<f64> = series.windows(2).map(|pair| pair[1] - pair[0]).collect();
    deltas.push(deltas[deltas.len() - 1]);
    deltas
}

/// Sign flips with zero treated as non-negative
fn sign_flips(window: &[f64]) -> u32 {
    let mut count = 0;
    for pair in window.windows(2) {
        if (pair[0] >= 0.0) != (pair[1] >= 0.0) {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn extractor(size: usize, overlap: usize) -> FeatureExtractor {
        FeatureExtractor::new(size, overlap, 1000.0).unwrap()
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        assert!(FeatureExtractor::new(4, 4, 1000.0).is_err());
        assert!(FeatureExtractor::new(0, 0, 1000.0).is_err());
    }

    #[test]
    fn test_output_length_formula() {
        // floor((L - w) / (w - o)) + 1 for every configuration
        for (size, overlap, len) in [(4usize, 0usize, 16usize), (4, 2, 16), (8, 7, 20), (5, 1, 5)] {
            let mut ext = extractor(size, overlap);
            let series = vec![1.0; len];
            let expected = (len - size) / (size - overlap) + 1;
            assert_eq!(
                ext.compute(FeatureKind::Mean, &series).unwrap().len(),
                expected,
                "size={} overlap={} len={}",
                size,
                overlap,
                len
            );
        }
    }

    #[test]
    fn test_short_series_yields_empty() {
        let mut ext = extractor(8, 0);
        assert!(ext.compute(FeatureKind::Mean, &[1.0; 7]).unwrap().is_empty());
    }

    #[test]
    fn test_variance_on_constant_series() {
        let mut ext = extractor(4, 0);
        let out = ext.compute(FeatureKind::Variance, &[5.0, 5.0, 5.0, 5.0]).unwrap();
        assert_eq!(out.len(), 1);
        // Σx² / (n-1) = 100 / 3
        assert!((out[0] - 100.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_crossings_alternating() {
        let mut ext = extractor(4, 0);
        let out = ext
            .compute(FeatureKind::ZeroCrossings, &[1.0, -1.0, 1.0, -1.0])
            .unwrap();
        assert_eq!(out, vec![3.0]);
    }

    #[test]
    fn test_zero_counts_as_non_negative() {
        let mut ext = extractor(3, 0);
        // 0 and 1 are on the same side; only the -1 transition flips
        let out = ext.compute(FeatureKind::ZeroCrossings, &[0.0, 1.0, -1.0]).unwrap();
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_waveform_length() {
        let mut ext = extractor(4, 0);
        let out = ext
            .compute(FeatureKind::WaveformLength, &[0.0, 2.0, -1.0, 1.0])
            .unwrap();
        assert_eq!(out, vec![2.0 + 3.0 + 2.0]);
    }

    #[test]
    fn test_slope_sign_changes_on_triangle() {
        // Deltas of [0,1,2,1,0,1]: [1,1,-1,-1,1] padded to [1,1,-1,-1,1,1];
        // sign flips at index 1->2 and 3->4
        let mut ext = extractor(6, 0);
        let out = ext
            .compute(FeatureKind::SlopeSignChanges, &[0.0, 1.0, 2.0, 1.0, 0.0, 1.0])
            .unwrap();
        assert_eq!(out, vec![2.0]);
    }

    #[test]
    fn test_wilson_amplitude_threshold() {
        let mut ext = extractor(4, 0);
        // Only segments ending above the threshold contribute
        let out = ext
            .compute(
                FeatureKind::WilsonAmplitude { threshold: 0.5 },
                &[0.0, 1.0, 0.2, 2.0],
            )
            .unwrap();
        // |1-0| (1 > 0.5) + |2-0.2| (2 > 0.5) = 1 + 1.8
        assert!((out[0] - 2.8).abs() < 1e-12);
    }

    #[test]
    fn test_raw_and_mean() {
        let mut ext = extractor(2, 0);
        let series = [3.0, 5.0, 7.0, 9.0];
        assert_eq!(ext.compute(FeatureKind::Raw, &series).unwrap(), vec![3.0, 7.0]);
        assert_eq!(ext.compute(FeatureKind::Mean, &series).unwrap(), vec![4.0, 8.0]);
    }

    #[test]
    fn test_mean_frequency_of_pure_tone() {
        let fs = 256.0;
        let mut ext = FeatureExtractor::new(256, 0, fs).unwrap();
        let series: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * 32.0 * i as f64 / fs).sin())
            .collect();

        let mean = ext.compute(FeatureKind::MeanFrequency, &series).unwrap()[0];
        let median = ext.compute(FeatureKind::MedianFrequency, &series).unwrap()[0];
        assert!((mean - 32.0).abs() < 2.0, "mean frequency {}", mean);
        assert!((median - 32.0).abs() < 2.0, "median frequency {}", median);
    }
}
