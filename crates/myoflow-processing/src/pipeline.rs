//! Per-channel processing pipeline
//!
//! Stage lists (filters, scalers, features) are registered per channel
//! type; every channel gets its own filter state instances. Stages execute
//! in registration order, and that order must be identical between the
//! training-time feature computation and the realtime scoring path. Both
//! paths are built from the same `PipelineSpec`, so the order cannot
//! diverge.

use crate::features::{FeatureExtractor, FeatureKind};
use crate::filters::{ChannelFilter, FilterSpec};
use crate::scalers::ScalerKind;
use myoflow_core::{ChannelKind, MyoError, MyoResult, Sample, SessionSettings};
use serde::{Deserialize, Serialize};

/// Ordered stage lists for one channel type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StageList {
    pub filters: Vec<FilterSpec>,
    pub scalers: Vec<ScalerKind>,
    pub features: Vec<FeatureKind>,
}

/// Stage lists per channel type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineSpec {
    pub generic: StageList,
    pub emg: StageList,
}

impl PipelineSpec {
    /// Typical surface-EMG configuration: powerline notch + drift removal,
    /// min-max scaling, the four Hudgins time-domain features
    pub fn emg_default(powerline_hz: f64) -> Self {
        PipelineSpec {
            generic: StageList {
                filters: Vec::new(),
                scalers: vec![ScalerKind::MinMaxZeroCenter],
                features: vec![FeatureKind::Mean],
            },
            emg: StageList {
                filters: vec![
                    FilterSpec::Highpass { cutoff_hz: 20.0 },
                    FilterSpec::Notch { freq_hz: powerline_hz, q: 30.0 },
                ],
                scalers: vec![ScalerKind::MinMaxZeroCenter],
                features: vec![
                    FeatureKind::MeanAbsoluteValue,
                    FeatureKind::ZeroCrossings,
                    FeatureKind::SlopeSignChanges,
                    FeatureKind::WaveformLength,
                ],
            },
        }
    }

    fn stage_list(&self, kind: ChannelKind) -> &StageList {
        match kind {
            ChannelKind::Generic => &self.generic,
            ChannelKind::Emg => &self.emg,
        }
    }
}

/// Composed per-channel pipeline.
///
/// Owns one filter instance per stage per channel so no recursion state is
/// ever shared across channels. A pipeline instance must serve exactly one
/// sample stream; feeding it two interleaved streams corrupts filter state.
pub struct Pipeline {
    spec: PipelineSpec,
    settings: SessionSettings,
    /// `channel_filters[channel]` holds that channel's stage instances in
    /// registration order; empty for inactive channels
    channel_filters: Vec<Vec<Box<dyn ChannelFilter>>>,
    extractor: FeatureExtractor,
}

impl Pipeline {
    pub fn new(spec: PipelineSpec, settings: &SessionSettings) -> MyoResult<Self> {
        settings.validate()?;
        let sampling_rate = settings.frequency_hz as f64;

        let mut channel_filters = Vec::with_capacity(settings.channel_count());
        for channel in &settings.channels {
            if !channel.active {
                channel_filters.push(Vec::new());
                continue;
            }
            let stage_list = spec.stage_list(channel.kind);
            let filters = stage_list
                .filters
                .iter()
                .map(|f| f.build(sampling_rate))
                .collect::<MyoResult<Vec<_>>>()?;
            channel_filters.push(filters);
        }

        let extractor = FeatureExtractor::new(
            settings.window_size,
            settings.window_overlap,
            sampling_rate,
        )?;

        Ok(Pipeline {
            spec,
            settings: settings.clone(),
            channel_filters,
            extractor,
        })
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// Number of feature values `map_features` produces per window span
    pub fn feature_len(&self) -> usize {
        let windows = self.extractor.output_len(self.settings.history_len());
        self.settings
            .channels
            .iter()
            .filter(|c| c.active)
            .map(|c| self.spec.stage_list(c.kind).features.len() * windows)
            .sum()
    }

    /// Run one freshly pulled sample through every channel's filter stages.
    ///
    /// Must be called exactly once per sample, in arrival order. Inactive
    /// channels pass through unmodified.
    pub fn filter_sample(&mut self, sample: &Sample) -> MyoResult<Sample> {
        if sample.channel_count() != self.channel_filters.len() {
            return Err(MyoError::Configuration {
                reason: format!(
                    "sample has {} channels, pipeline expects {}",
                    sample.channel_count(),
                    self.channel_filters.len()
                ),
            });
        }

        let mut filtered = Vec::with_capacity(sample.channel_count());
        for (filters, &value) in self.channel_filters.iter_mut().zip(sample.channels()) {
            let mut current = value;
            for filter in filters.iter_mut() {
                current = filter.process(current);
            }
            filtered.push(current);
        }
        Ok(Sample::from_parts(filtered, sample.timestamp_us()))
    }

    /// Filter whole per-channel series (training/calibration data).
    ///
    /// Each channel's series runs through fresh copies of that channel's
    /// filter stages, so offline use cannot corrupt the realtime state.
    pub fn filter_signals(&self, channels: &[Vec<f64>]) -> MyoResult<Vec<Vec<f64>>> {
        self.check_channel_count(channels.len())?;
        let sampling_rate = self.settings.frequency_hz as f64;

        let mut out = Vec::with_capacity(channels.len());
        for (index, series) in channels.iter().enumerate() {
            let config = &self.settings.channels[index];
            if !config.active {
                out.push(series.clone());
                continue;
            }
            let mut filters = self
                .spec
                .stage_list(config.kind)
                .filters
                .iter()
                .map(|f| f.build(sampling_rate))
                .collect::<MyoResult<Vec<_>>>()?;

            let mut filtered = series.clone();
            for filter in filters.iter_mut() {
                for value in filtered.iter_mut() {
                    *value = filter.process(*value);
                }
            }
            out.push(filtered);
        }
        Ok(out)
    }

    /// Apply each channel's scaler stages in registration order.
    /// Inactive channels pass through unmodified.
    pub fn scale_signals(&self, channels: &[Vec<f64>]) -> MyoResult<Vec<Vec<f64>>> {
        self.check_channel_count(channels.len())?;

        let mut out = Vec::with_capacity(channels.len());
        for (index, series) in channels.iter().enumerate() {
            let config = &self.settings.channels[index];
            if !config.active {
                out.push(series.clone());
                continue;
            }
            let scalers = &self.spec.stage_list(config.kind).scalers;
            let scaled = series
                .iter()
                .map(|&value| {
                    scalers
                        .iter()
                        .fold(value, |acc, scaler| scaler.apply(acc, &config.stats))
                })
                .collect();
            out.push(scaled);
        }
        Ok(out)
    }

    /// Reduce per-channel series to one flat feature vector.
    ///
    /// Channel order, then feature registration order, then window order;
    /// inactive channels contribute nothing.
    pub fn map_features(&mut self, channels: &[Vec<f64>]) -> MyoResult<Vec<f64>> {
        self.check_channel_count(channels.len())?;

        let mut features = Vec::new();
        for (index, series) in channels.iter().enumerate() {
            let config = &self.settings.channels[index];
            if !config.active {
                continue;
            }
            for kind in &self.spec.stage_list(config.kind).features {
                features.extend(self.extractor.compute(*kind, series)?);
            }
        }
        Ok(features)
    }

    /// Scale then feature-map in one call, the realtime scoring order
    pub fn scale_and_map(&mut self, channels: &[Vec<f64>]) -> MyoResult<Vec<f64>> {
        let scaled = self.scale_signals(channels)?;
        self.map_features(&scaled)
    }

    /// Zero all realtime filter state (e.g. between runs)
    pub fn reset(&mut self) {
        for filters in &mut self.channel_filters {
            for filter in filters.iter_mut() {
                filter.reset();
            }
        }
    }

    fn check_channel_count(&self, got: usize) -> MyoResult<()> {
        if got != self.settings.channel_count() {
            return Err(MyoError::Configuration {
                reason: format!(
                    "{} channel series given, settings expect {}",
                    got,
                    self.settings.channel_count()
                ),
            });
        }
        Ok(())
    }
}
