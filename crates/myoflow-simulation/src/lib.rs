//! Myoflow-Simulation: synthetic EMG signal generation
//!
//! Provides a deterministic stand-in for acquisition hardware: a
//! seedable multi-channel signal source driven by activation patterns,
//! plus an async streaming wrapper for live consumers.

pub mod generator;
pub mod patterns;
pub mod stream;

pub use generator::{NoiseConfig, SyntheticConfig, SyntheticSource};
pub use patterns::ActivationPattern;
pub use stream::{start_sample_stream, SampleStream, StreamCommand, StreamConfig};
