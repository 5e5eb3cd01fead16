//! Myoflow-Processing: per-channel signal conditioning and feature mapping
//!
//! Stateful channel filters, frozen-statistics scalers, windowed feature
//! extraction and the per-channel-type pipeline that composes them, plus
//! classifier-output post-processing.

pub mod features;
pub mod filters;
pub mod pipeline;
pub mod postprocess;
pub mod scalers;

pub use features::{FeatureExtractor, FeatureKind};
pub use filters::{ChannelFilter, FilterSpec};
pub use pipeline::{Pipeline, PipelineSpec, StageList};
pub use postprocess::{arg_max, MajorityVote, PostProcessor, VelocityRamp};
pub use scalers::ScalerKind;
