//! Clock abstraction for deterministic timing
//!
//! The loop and the training-session schedule never read wall-clock time
//! directly; they ask an injected `Clock` for the elapsed time since run
//! start, so tests can drive state machines with a manual clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source measured from its own creation
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn elapsed(&self) -> Duration;

    /// Elapsed milliseconds, the resolution of the training schedule
    fn elapsed_ms(&self) -> i64 {
        self.elapsed().as_millis() as i64
    }

    /// Elapsed microseconds, the resolution of sample timestamps
    fn elapsed_us(&self) -> i64 {
        self.elapsed().as_micros() as i64
    }
}

/// Real monotonic clock backed by `std::time::Instant`
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Arc<Self> {
        Arc::new(MonotonicClock { start: Instant::now() })
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(ManualClock { nanos: AtomicU64::new(0) })
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: u64) {
        self.nanos.store(ms * 1_000_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
