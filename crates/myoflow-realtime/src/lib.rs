//! Myoflow-Realtime: precision acquisition loop, training sessions and
//! realtime scoring
//!
//! A dedicated thread pulls samples from an external source at a fixed
//! rate and hands each one, under a single lock, to a per-tick strategy:
//! the training session labels and records it, the realtime scorer turns
//! the sample history into classifier scores.

pub mod acquisition;
pub mod clock;
pub mod contracts;
pub mod scorer;
pub mod training;

pub use acquisition::{AcquisitionLoop, LoopStats, SharedState, StateHandle, TickHandler};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use contracts::{CsvRowSink, MemorySink, Predictor, RecordSink, SampleSource};
pub use scorer::RealtimeScorer;
pub use training::{SessionPhase, TrainingSession};
