//! Guided training data collection
//!
//! A session walks the operator through alternating relax/contract
//! segments, one segment pair per output class, repeated for the
//! configured number of cycles. Samples that fall inside a contraction
//! segment are labeled with the active class and written to the sink;
//! relax-segment samples are dropped.

use crate::acquisition::{SharedState, TickHandler};
use crate::clock::Clock;
use crate::contracts::RecordSink;
use myoflow_core::{MyoError, MyoResult, Sample, SessionSettings};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SessionPhase {
    Idle,
    Collecting,
    Finished,
}

pub struct TrainingSession {
    id: Uuid,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    sink: Box<dyn RecordSink>,
    phase: SessionPhase,
    start_ms: i64,
    current_cycle: u32,
    rows_written: u64,
}

impl TrainingSession {
    pub fn new(
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
        sink: Box<dyn RecordSink>,
    ) -> MyoResult<Self> {
        settings.validate()?;
        Ok(TrainingSession {
            id: Uuid::new_v4(),
            settings,
            clock,
            sink,
            phase: SessionPhase::Idle,
            start_ms: 0,
            current_cycle: 0,
            rows_written: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Repetition cycle the schedule is currently in, starting at 0
    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    /// Relax plus contraction, the per-class schedule unit in ms
    fn segment_ms(&self) -> i64 {
        self.settings.relax_time_ms + self.settings.contraction_time_ms
    }

    /// Full schedule length across all classes and cycles in ms
    fn total_ms(&self) -> i64 {
        self.segment_ms()
            * self.settings.output_count() as i64
            * self.settings.collection_cycles as i64
    }

    /// Begin collecting. Valid from Idle or Finished; restarting a
    /// finished session starts a fresh schedule against the same sink.
    pub fn start_data_collection(&mut self) -> MyoResult<()> {
        if self.phase == SessionPhase::Collecting {
            return Err(MyoError::State {
                reason: "data collection already in progress".to_string(),
            });
        }
        self.start_ms = self.clock.elapsed_ms();
        self.current_cycle = 0;
        self.rows_written = 0;
        self.sink.write_header(self.settings.channel_count())?;
        self.phase = SessionPhase::Collecting;
        info!(session = %self.id, start_ms = self.start_ms, "data collection started");
        Ok(())
    }

    /// Finish early, flushing and closing the sink
    pub fn end_data_collection(&mut self) -> MyoResult<()> {
        if self.phase != SessionPhase::Collecting {
            return Err(MyoError::State {
                reason: "no data collection in progress".to_string(),
            });
        }
        self.finish()
    }

    fn finish(&mut self) -> MyoResult<()> {
        self.sink.flush()?;
        self.sink.close()?;
        self.phase = SessionPhase::Finished;
        info!(session = %self.id, rows = self.rows_written, "data collection finished");
        Ok(())
    }

    /// Class and recording flag for a given offset into the schedule
    fn schedule_at(&self, elapsed_ms: i64) -> (usize, bool) {
        let segment = self.segment_ms();
        let class = (elapsed_ms / segment) as usize % self.settings.output_count();
        let recording = elapsed_ms % segment >= self.settings.relax_time_ms;
        (class, recording)
    }
}

impl TickHandler for TrainingSession {
    fn on_tick(&mut self, sample: Sample, state: &mut SharedState) -> MyoResult<()> {
        match self.phase {
            SessionPhase::Idle => {
                return Err(MyoError::State {
                    reason: "tick received before data collection started".to_string(),
                });
            }
            SessionPhase::Finished => {
                state.history.push(&sample)?;
                return Ok(());
            }
            SessionPhase::Collecting => {}
        }

        let elapsed = sample.timestamp_ms() - self.start_ms;
        if elapsed >= self.total_ms() {
            state.recording = false;
            state.history.push(&sample)?;
            return self.finish();
        }

        let (class, recording) = self.schedule_at(elapsed);
        self.current_cycle =
            (elapsed / (self.segment_ms() * self.settings.output_count() as i64)) as u32;
        state.current_class = class;
        state.recording = recording;
        state.history.push(&sample)?;

        if recording {
            self.sink
                .write_row(sample.timestamp_ms(), sample.channels(), class)?;
            self.rows_written += 1;
        }
        Ok(())
    }
}
