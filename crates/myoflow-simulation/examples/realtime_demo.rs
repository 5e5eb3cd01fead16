//! End-to-end demo: synthetic EMG into the acquisition loop, scored
//! live by a toy amplitude classifier.
//!
//! Run with `cargo run -p myoflow-simulation --example realtime_demo`.

use anyhow::Result;
use myoflow_core::{ChannelConfig, ChannelStats, MyoResult, SessionSettings};
use myoflow_processing::{arg_max, Pipeline, PipelineSpec, PostProcessor};
use myoflow_realtime::{AcquisitionLoop, Predictor, RealtimeScorer, TickHandler};
use myoflow_simulation::{ActivationPattern, NoiseConfig, SyntheticConfig, SyntheticSource};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::info;

/// Two-class toy model: mean feature magnitude above a threshold means
/// contraction, below means rest.
struct AmplitudeModel {
    threshold: f64,
}

impl Predictor for AmplitudeModel {
    fn train(&mut self, _features: &[Vec<f64>], _labels: &[usize]) -> MyoResult<()> {
        Ok(())
    }

    fn predict(&mut self, features: &[f64]) -> MyoResult<Vec<f64>> {
        let mean = features.iter().map(|v| v.abs()).sum::<f64>() / features.len() as f64;
        if mean > self.threshold {
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

fn demo_settings() -> SessionSettings {
    let stats = ChannelStats {
        min: -2.5,
        max: 2.5,
        mean: 0.0,
        std_dev: 0.8,
    };
    SessionSettings {
        channels: (0..4).map(|_| ChannelConfig::emg(stats)).collect(),
        frequency_hz: 200,
        window_size: 40,
        window_overlap: 20,
        window_count: 3,
        output_labels: vec!["rest".to_string(), "contract".to_string()],
        ..SessionSettings::default()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let settings = demo_settings();
    let source = SyntheticSource::new(SyntheticConfig {
        channel_count: settings.channel_count(),
        sampling_rate_hz: settings.frequency_hz as f64,
        pattern: ActivationPattern::Burst {
            on_duration_s: 1.5,
            off_duration_s: 1.5,
            amplitude: 0.8,
        },
        noise: NoiseConfig::default(),
        powerline_hz: Some(50.0),
        seed: Some(1234),
    })?;

    let pipeline = Pipeline::new(PipelineSpec::emg_default(50.0), &settings)?;
    let scorer = RealtimeScorer::new(
        pipeline,
        Box::new(AmplitudeModel { threshold: 0.08 }),
        PostProcessor::new().with_majority_vote(5, settings.output_count())?,
    );
    let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(scorer));

    let mut looper = AcquisitionLoop::new(settings.clone())?;
    let state = looper.handle();
    state.set_prediction_enabled(true);
    looper.start(Box::new(source), handler)?;

    info!("streaming for 6 seconds, watch the class flip with the bursts");
    for _ in 0..12 {
        thread::sleep(Duration::from_millis(500));
        let scores = state.latest_scores();
        if scores.is_empty() {
            continue;
        }
        let class = arg_max(&scores);
        info!(
            label = settings.output_labels[class].as_str(),
            ?scores,
            ticks = state.stats().ticks,
            "current decision"
        );
    }

    looper.stop()?;
    info!(stats = ?state.stats(), "demo finished");
    Ok(())
}
