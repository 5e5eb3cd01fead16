//! Myoflow-Core: Foundation types for real-time biosignal acquisition
//!
//! Samples, channel model, session settings and the shared history buffer.

pub mod channel;
pub mod error;
pub mod history;
pub mod sample;
pub mod settings;

pub use channel::*;
pub use error::{MyoError, MyoResult};
pub use history::HistoryBuffer;
pub use sample::Sample;
pub use settings::SessionSettings;
