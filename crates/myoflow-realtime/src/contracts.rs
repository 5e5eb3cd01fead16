//! External collaborator contracts: data source, record sink, predictor
//!
//! The core never inspects how these are implemented; hardware drivers,
//! file writers and classifiers live behind these traits.

use myoflow_core::{MyoError, MyoResult};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Zero-argument pull of one fresh sample vector, one value per channel in
/// fixed channel order. Invoked by the acquisition loop once per tick; a
/// failed pull is fatal to the loop.
pub trait SampleSource: Send {
    fn pull(&mut self) -> MyoResult<Vec<f64>>;
}

/// Closures work as sources
impl<F> SampleSource for F
where
    F: FnMut() -> MyoResult<Vec<f64>> + Send,
{
    fn pull(&mut self) -> MyoResult<Vec<f64>> {
        self()
    }
}

/// Classifier contract. `predict` must be deterministic once `train` or
/// `load` has completed; the score vector length equals the output count.
pub trait Predictor: Send {
    fn train(&mut self, features: &[Vec<f64>], labels: &[usize]) -> MyoResult<()>;
    fn predict(&mut self, features: &[f64]) -> MyoResult<Vec<f64>>;
    fn save(&self, path: &Path) -> MyoResult<()>;
    fn load(&mut self, path: &Path) -> MyoResult<()>;
}

/// Append-only storage for labeled, timestamped rows.
///
/// Row shape: leading type tag (header vs. data), timestamp, one value per
/// channel, trailing integer class label.
pub trait RecordSink: Send {
    /// Emit the header row naming each channel column
    fn write_header(&mut self, channel_count: usize) -> MyoResult<()>;

    /// Emit one data row
    fn write_row(&mut self, timestamp_ms: i64, values: &[f64], class: usize) -> MyoResult<()>;

    /// Force buffered rows to durable storage
    fn flush(&mut self) -> MyoResult<()>;

    /// Flush and mark the sink closed; further writes fail
    fn close(&mut self) -> MyoResult<()>;
}

/// Comma-separated row sink over any writer
pub struct CsvRowSink<W: Write + Send> {
    writer: W,
    closed: bool,
}

impl<W: Write + Send> CsvRowSink<W> {
    pub fn new(writer: W) -> Self {
        CsvRowSink { writer, closed: false }
    }

    fn check_open(&self) -> MyoResult<()> {
        if self.closed {
            return Err(MyoError::Sink {
                reason: "sink is closed".to_string(),
            });
        }
        Ok(())
    }
}

impl<W: Write + Send> RecordSink for CsvRowSink<W> {
    fn write_header(&mut self, channel_count: usize) -> MyoResult<()> {
        self.check_open()?;
        write!(self.writer, "header,timestamp")?;
        for ch in 0..channel_count {
            write!(self.writer, ",ch{}", ch)?;
        }
        writeln!(self.writer, ",class")?;
        Ok(())
    }

    fn write_row(&mut self, timestamp_ms: i64, values: &[f64], class: usize) -> MyoResult<()> {
        self.check_open()?;
        write!(self.writer, "data,{}", timestamp_ms)?;
        for value in values {
            write!(self.writer, ",{}", value)?;
        }
        writeln!(self.writer, ",{}", class)?;
        Ok(())
    }

    fn flush(&mut self) -> MyoResult<()> {
        self.check_open()?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> MyoResult<()> {
        if !self.closed {
            self.writer.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}

/// One recorded data row, for inspection in tests
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub timestamp_ms: i64,
    pub values: Vec<f64>,
    pub class: usize,
}

/// Shared in-memory sink; clones observe the same rows
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    rows: Vec<MemoryRow>,
    header_written: bool,
    flushes: usize,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<MemoryRow> {
        self.inner.lock().unwrap().rows.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn flush_count(&self) -> usize {
        self.inner.lock().unwrap().flushes
    }

    pub fn header_written(&self) -> bool {
        self.inner.lock().unwrap().header_written
    }
}

impl RecordSink for MemorySink {
    fn write_header(&mut self, _channel_count: usize) -> MyoResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(MyoError::Sink { reason: "sink is closed".to_string() });
        }
        inner.header_written = true;
        Ok(())
    }

    fn write_row(&mut self, timestamp_ms: i64, values: &[f64], class: usize) -> MyoResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(MyoError::Sink { reason: "sink is closed".to_string() });
        }
        inner.rows.push(MemoryRow {
            timestamp_ms,
            values: values.to_vec(),
            class,
        });
        Ok(())
    }

    fn flush(&mut self) -> MyoResult<()> {
        self.inner.lock().unwrap().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> MyoResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.flushes += 1;
        inner.closed = true;
        Ok(())
    }
}
