//! Per-tick realtime scoring
//!
//! The scorer runs each incoming sample through the stateful channel
//! filters, feeds it into the history buffer, and, when prediction is
//! enabled, maps the full history window into a feature vector for the
//! classifier. Post-processing smooths the resulting score vector
//! before it is published on the shared state.

use crate::acquisition::{SharedState, TickHandler};
use crate::contracts::Predictor;
use myoflow_core::{MyoResult, Sample};
use myoflow_processing::{Pipeline, PostProcessor};
use tracing::debug;

pub struct RealtimeScorer {
    pipeline: Pipeline,
    predictor: Box<dyn Predictor>,
    post: PostProcessor,
    filter_incoming: bool,
}

impl RealtimeScorer {
    pub fn new(pipeline: Pipeline, predictor: Box<dyn Predictor>, post: PostProcessor) -> Self {
        RealtimeScorer {
            pipeline,
            predictor,
            post,
            filter_incoming: true,
        }
    }

    /// Store raw samples instead of filtered ones; features are still
    /// computed from whatever the history holds
    pub fn without_incoming_filter(mut self) -> Self {
        self.filter_incoming = false;
        self
    }

    /// Clear filter state between runs so old signal does not bleed in
    pub fn reset(&mut self) {
        self.pipeline.reset();
    }
}

impl TickHandler for RealtimeScorer {
    fn on_tick(&mut self, sample: Sample, state: &mut SharedState) -> MyoResult<()> {
        let stored = if self.filter_incoming {
            self.pipeline.filter_sample(&sample)?
        } else {
            sample
        };
        state.history.push(&stored)?;

        if !state.prediction_enabled {
            return Ok(());
        }

        let snapshot = state.history.snapshot();
        let features = self.pipeline.scale_and_map(&snapshot)?;
        let scores = self.predictor.predict(&features)?;
        let scores = self.post.process(&scores);
        debug!(?scores, "tick scored");
        state.scores = scores;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myoflow_core::{ChannelConfig, MyoError, SessionSettings};
    use myoflow_processing::{FeatureKind, PipelineSpec, ScalerKind, StageList};
    use std::path::Path;

    struct MeanSplit;

    impl Predictor for MeanSplit {
        fn train(&mut self, _features: &[Vec<f64>], _labels: &[usize]) -> MyoResult<()> {
            Ok(())
        }

        fn predict(&mut self, features: &[f64]) -> MyoResult<Vec<f64>> {
            let mean = features.iter().sum::<f64>() / features.len() as f64;
            if mean > 0.5 {
                Ok(vec![0.0, 1.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }

        fn save(&self, _path: &Path) -> MyoResult<()> {
            Ok(())
        }

        fn load(&mut self, _path: &Path) -> MyoResult<()> {
            Ok(())
        }
    }

    struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn train(&mut self, _features: &[Vec<f64>], _labels: &[usize]) -> MyoResult<()> {
            Ok(())
        }

        fn predict(&mut self, _features: &[f64]) -> MyoResult<Vec<f64>> {
            Err(MyoError::State { reason: "model not loaded".to_string() })
        }

        fn save(&self, _path: &Path) -> MyoResult<()> {
            Ok(())
        }

        fn load(&mut self, _path: &Path) -> MyoResult<()> {
            Ok(())
        }
    }

    fn scorer_settings() -> SessionSettings {
        SessionSettings {
            channels: vec![ChannelConfig::generic(), ChannelConfig::generic()],
            window_size: 10,
            window_overlap: 5,
            window_count: 2,
            output_labels: vec!["rest".into(), "active".into()],
            ..SessionSettings::default()
        }
    }

    fn mean_only_spec() -> PipelineSpec {
        PipelineSpec {
            generic: StageList {
                filters: Vec::new(),
                scalers: vec![ScalerKind::MinMaxZeroCenter],
                features: vec![FeatureKind::Mean],
            },
            emg: StageList::default(),
        }
    }

    fn run_ticks(scorer: &mut RealtimeScorer, state: &mut SharedState, value: f64, count: usize) {
        let start = state.history.last_timestamp_us();
        for i in 0..count {
            let sample =
                Sample::from_parts(vec![value, value], start + 10 * (i as i64 + 1));
            scorer.on_tick(sample, state).unwrap();
        }
    }

    #[test]
    fn test_no_scores_until_prediction_enabled() {
        let settings = scorer_settings();
        let pipeline = Pipeline::new(mean_only_spec(), &settings).unwrap();
        let mut scorer = RealtimeScorer::new(pipeline, Box::new(MeanSplit), PostProcessor::new());
        let mut state = SharedState::new(&settings).unwrap();

        run_ticks(&mut scorer, &mut state, 1.0, 5);
        assert!(state.scores.is_empty());
    }

    #[test]
    fn test_scores_follow_signal_level() {
        let settings = scorer_settings();
        let pipeline = Pipeline::new(mean_only_spec(), &settings).unwrap();
        let mut scorer = RealtimeScorer::new(pipeline, Box::new(MeanSplit), PostProcessor::new())
            .without_incoming_filter();
        let mut state = SharedState::new(&settings).unwrap();
        state.prediction_enabled = true;

        // Generic stats default to zeros, min == max passes values through,
        // so a constant 0.8 signal means every feature window is 0.8.
        run_ticks(&mut scorer, &mut state, 0.8, 20);
        assert_eq!(state.scores, vec![0.0, 1.0]);

        run_ticks(&mut scorer, &mut state, 0.1, 20);
        assert_eq!(state.scores, vec![1.0, 0.0]);
    }

    #[test]
    fn test_predictor_failure_propagates() {
        let settings = scorer_settings();
        let pipeline = Pipeline::new(mean_only_spec(), &settings).unwrap();
        let mut scorer =
            RealtimeScorer::new(pipeline, Box::new(FailingPredictor), PostProcessor::new());
        let mut state = SharedState::new(&settings).unwrap();
        state.prediction_enabled = true;

        let sample = Sample::from_parts(vec![0.0, 0.0], 10);
        assert!(scorer.on_tick(sample, &mut state).is_err());
    }

    #[test]
    fn test_ramp_smooths_scores() {
        let settings = scorer_settings();
        let pipeline = Pipeline::new(mean_only_spec(), &settings).unwrap();
        let post = PostProcessor::new().with_velocity_ramp(2, 0.5).unwrap();
        let mut scorer = RealtimeScorer::new(pipeline, Box::new(MeanSplit), post)
            .without_incoming_filter();
        let mut state = SharedState::new(&settings).unwrap();
        state.prediction_enabled = true;

        run_ticks(&mut scorer, &mut state, 0.8, 1);
        assert_eq!(state.scores, vec![0.0, 0.5]);
        run_ticks(&mut scorer, &mut state, 0.8, 1);
        assert_eq!(state.scores, vec![0.0, 1.0]);
    }
}
