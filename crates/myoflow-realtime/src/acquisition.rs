//! Fixed-rate acquisition loop
//!
//! A dedicated OS thread polls a [`SampleSource`] at the configured
//! sampling frequency. Tick deadlines are derived from the loop start
//! (`start + n * period`) rather than from the previous tick, so timing
//! error does not accumulate. The thread sleeps until roughly a
//! millisecond before each deadline and spin-waits the remainder;
//! OS sleep alone is too coarse at EMG rates.

use crate::clock::{Clock, MonotonicClock};
use crate::contracts::SampleSource;
use myoflow_core::{HistoryBuffer, MyoError, MyoResult, Sample, SessionSettings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const SPIN_THRESHOLD: Duration = Duration::from_micros(1200);

/// Counters published by the running loop
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LoopStats {
    pub ticks: u64,
    pub missed_deadlines: u64,
    pub last_tick_us: u64,
    pub running: bool,
}

/// State shared between the loop thread and outside readers.
///
/// Everything lives under one mutex; per-tick work holds the lock for
/// the duration of the handler call, so readers never observe a
/// half-updated tick.
pub struct SharedState {
    pub history: HistoryBuffer,
    pub recording: bool,
    pub current_class: usize,
    pub prediction_enabled: bool,
    pub scores: Vec<f64>,
    pub stats: LoopStats,
}

impl SharedState {
    pub fn new(settings: &SessionSettings) -> MyoResult<Self> {
        Ok(SharedState {
            history: HistoryBuffer::new(settings.channel_count(), settings.history_len())?,
            recording: false,
            current_class: 0,
            prediction_enabled: false,
            scores: Vec::new(),
            stats: LoopStats::default(),
        })
    }
}

/// Per-tick strategy invoked by the loop thread with the fresh sample
/// and the shared state locked
pub trait TickHandler: Send {
    fn on_tick(&mut self, sample: Sample, state: &mut SharedState) -> MyoResult<()>;
}

impl<F> TickHandler for F
where
    F: FnMut(Sample, &mut SharedState) -> MyoResult<()> + Send,
{
    fn on_tick(&mut self, sample: Sample, state: &mut SharedState) -> MyoResult<()> {
        self(sample, state)
    }
}

/// Read-only view over the shared state for threads outside the loop
#[derive(Clone)]
pub struct StateHandle {
    state: Arc<Mutex<SharedState>>,
}

impl StateHandle {
    pub fn history_snapshot(&self) -> Vec<Vec<f64>> {
        self.state.lock().unwrap().history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    pub fn latest_scores(&self) -> Vec<f64> {
        self.state.lock().unwrap().scores.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().unwrap().recording
    }

    pub fn current_class(&self) -> usize {
        self.state.lock().unwrap().current_class
    }

    pub fn set_prediction_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().prediction_enabled = enabled;
    }

    pub fn stats(&self) -> LoopStats {
        self.state.lock().unwrap().stats
    }
}

/// Owns the acquisition thread and its cancellation flag
pub struct AcquisitionLoop {
    settings: SessionSettings,
    state: Arc<Mutex<SharedState>>,
    clock: Arc<dyn Clock>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<MyoResult<()>>>,
    last_error: Option<MyoError>,
    pull_timeout: Option<Duration>,
}

impl AcquisitionLoop {
    pub fn new(settings: SessionSettings) -> MyoResult<Self> {
        settings.validate()?;
        let state = Arc::new(Mutex::new(SharedState::new(&settings)?));
        Ok(AcquisitionLoop {
            settings,
            state,
            clock: MonotonicClock::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            worker: None,
            last_error: None,
            pull_timeout: None,
        })
    }

    /// Use a caller-supplied clock instead of the default monotonic one.
    ///
    /// Sample timestamps are read from this clock, so a handler that
    /// keeps its own schedule against the same clock sees consistent
    /// elapsed times.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound on a single source pull. The pull itself cannot be
    /// preempted; a pull that comes back later than this stops the loop
    /// with a `SourceFailure`, since every subsequent tick would already
    /// be stale.
    pub fn with_pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = Some(timeout);
        self
    }

    pub fn handle(&self) -> StateHandle {
        StateHandle { state: Arc::clone(&self.state) }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the loop thread. Starting while already running is a no-op.
    ///
    /// The handler is shared so the caller can keep driving it (phase
    /// changes, prediction toggles) while the loop ticks. Lock order is
    /// handler first, then state.
    pub fn start(
        &mut self,
        mut source: Box<dyn SampleSource>,
        handler: Arc<Mutex<dyn TickHandler>>,
    ) -> MyoResult<()> {
        if self.worker.is_some() {
            warn!("acquisition loop already running");
            return Ok(());
        }

        let period = Duration::from_secs_f64(self.settings.period_ms() / 1000.0);
        let frequency_hz = self.settings.frequency_hz;
        let channel_count = self.settings.channel_count();
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let cancel = Arc::clone(&self.cancel);

        self.cancel.store(false, Ordering::SeqCst);
        self.last_error = None;
        let pull_timeout = self.pull_timeout;
        {
            let mut guard = state.lock().unwrap();
            guard.history.clear();
            guard.scores.clear();
            guard.stats = LoopStats { running: true, ..LoopStats::default() };
        }

        info!(
            frequency_hz = self.settings.frequency_hz,
            channels = channel_count,
            "starting acquisition loop"
        );

        let worker = thread::Builder::new()
            .name("myoflow-acquisition".to_string())
            .spawn(move || -> MyoResult<()> {
                let start = Instant::now();
                let origin_us = clock.elapsed_us();
                let mut tick: u64 = 0;
                let result = loop {
                    if cancel.load(Ordering::SeqCst) {
                        break Ok(());
                    }

                    let target = start + period * (tick as u32 + 1);
                    wait_until(target);
                    let tick_start = Instant::now();

                    let values = match source.pull() {
                        Ok(values) => values,
                        Err(err) => break Err(err),
                    };
                    if let Some(timeout) = pull_timeout {
                        let pull_took = tick_start.elapsed();
                        if pull_took > timeout {
                            break Err(MyoError::SourceFailure {
                                reason: format!(
                                    "source pull took {:?}, bound is {:?}",
                                    pull_took, timeout
                                ),
                            });
                        }
                    }
                    // Stamp from the tick index so consecutive samples stay
                    // strictly increasing even above 1 kHz, where wall-clock
                    // truncation would collide.
                    let timestamp_us =
                        origin_us + ((tick as i64 + 1) * 1_000_000) / frequency_hz as i64;
                    let sample = match Sample::new(values, timestamp_us, channel_count) {
                        Ok(sample) => sample,
                        Err(err) => break Err(err),
                    };

                    {
                        let mut handler = handler.lock().unwrap();
                        let mut state = state.lock().unwrap();
                        if let Err(err) = handler.on_tick(sample, &mut state) {
                            break Err(err);
                        }
                        state.stats.ticks = tick + 1;
                        state.stats.last_tick_us = tick_start.elapsed().as_micros() as u64;
                        if Instant::now() > target + period {
                            state.stats.missed_deadlines += 1;
                        }
                    }

                    tick += 1;
                };
                state.lock().unwrap().stats.running = false;
                if let Err(ref err) = result {
                    warn!(error = %err, "acquisition loop stopped on error");
                }
                result
            })
            .map_err(|e| MyoError::State { reason: format!("failed to spawn loop thread: {}", e) })?;

        self.worker = Some(worker);
        Ok(())
    }

    /// Signal cancellation and join the loop thread, surfacing any error
    /// that stopped it early. Stopping an idle loop is a no-op.
    pub fn stop(&mut self) -> MyoResult<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.cancel.store(true, Ordering::SeqCst);
        match worker.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
            Err(_) => Err(MyoError::State { reason: "acquisition thread panicked".to_string() }),
        }
    }

    /// Error that terminated the last run, if any
    pub fn take_error(&mut self) -> Option<MyoError> {
        self.last_error.take()
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Sleep until close to the target, then spin out the remainder
fn wait_until(target: Instant) {
    loop {
        let now = Instant::now();
        if now >= target {
            return;
        }
        let remaining = target - now;
        if remaining > SPIN_THRESHOLD {
            thread::sleep(remaining - SPIN_THRESHOLD);
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(frequency_hz: u32) -> SessionSettings {
        SessionSettings { frequency_hz, ..SessionSettings::default() }
    }

    struct PushHandler;

    impl TickHandler for PushHandler {
        fn on_tick(&mut self, sample: Sample, state: &mut SharedState) -> MyoResult<()> {
            state.history.push(&sample)
        }
    }

    #[test]
    fn test_loop_ticks_and_stops() {
        let settings = test_settings(200);
        let mut looper = AcquisitionLoop::new(settings).unwrap();
        let handle = looper.handle();

        let source = Box::new(|| -> MyoResult<Vec<f64>> { Ok(vec![1.0, 2.0, 3.0, 4.0]) });
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        looper.start(source, handler).unwrap();
        assert!(looper.is_running());

        thread::sleep(Duration::from_millis(100));
        looper.stop().unwrap();
        assert!(!looper.is_running());

        let stats = handle.stats();
        assert!(stats.ticks >= 10, "expected ticks, got {}", stats.ticks);
        assert!(!stats.running);
    }

    #[test]
    fn test_source_failure_stops_loop() {
        let mut looper = AcquisitionLoop::new(test_settings(500)).unwrap();
        let mut remaining = 3;
        let source = Box::new(move || -> MyoResult<Vec<f64>> {
            if remaining == 0 {
                return Err(MyoError::SourceFailure { reason: "device unplugged".to_string() });
            }
            remaining -= 1;
            Ok(vec![0.0; 4])
        });
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        looper.start(source, handler).unwrap();

        thread::sleep(Duration::from_millis(50));
        let err = looper.stop().unwrap_err();
        assert!(matches!(err, MyoError::SourceFailure { .. }));
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut looper = AcquisitionLoop::new(test_settings(200)).unwrap();
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        let make_source = || Box::new(|| -> MyoResult<Vec<f64>> { Ok(vec![0.0; 4]) });
        looper.start(make_source(), Arc::clone(&handler)).unwrap();
        looper.start(make_source(), handler).unwrap();
        looper.stop().unwrap();
    }

    #[test]
    fn test_slow_pull_violates_timeout() {
        let mut looper = AcquisitionLoop::new(test_settings(100))
            .unwrap()
            .with_pull_timeout(Duration::from_millis(2));
        let source = Box::new(|| -> MyoResult<Vec<f64>> {
            thread::sleep(Duration::from_millis(20));
            Ok(vec![0.0; 4])
        });
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        looper.start(source, handler).unwrap();

        thread::sleep(Duration::from_millis(100));
        let err = looper.stop().unwrap_err();
        assert!(matches!(err, MyoError::SourceFailure { .. }));
    }

    #[test]
    fn test_restart_zeroes_history() {
        let mut looper = AcquisitionLoop::new(test_settings(200)).unwrap();
        let handle = looper.handle();
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));

        let source = Box::new(|| -> MyoResult<Vec<f64>> { Ok(vec![7.0; 4]) });
        looper.start(source, Arc::clone(&handler)).unwrap();
        thread::sleep(Duration::from_millis(50));
        looper.stop().unwrap();
        assert!(handle.history_snapshot()[0].iter().any(|&v| v != 0.0));

        let source = Box::new(|| -> MyoResult<Vec<f64>> { Ok(vec![0.0; 4]) });
        looper.start(source, handler).unwrap();
        looper.stop().unwrap();
        assert!(handle.history_snapshot()[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_high_rate_timestamps_stay_monotonic() {
        // At 2 kHz the tick period is below a millisecond, so timestamps
        // must not collide and trip the history monotonicity check.
        let mut looper = AcquisitionLoop::new(test_settings(2000)).unwrap();
        let handle = looper.handle();
        let source = Box::new(|| -> MyoResult<Vec<f64>> { Ok(vec![0.5; 4]) });
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        looper.start(source, handler).unwrap();

        thread::sleep(Duration::from_millis(100));
        looper.stop().unwrap();

        let stats = handle.stats();
        assert!(stats.ticks > 50, "expected many ticks, got {}", stats.ticks);
    }

    #[test]
    fn test_samples_stamped_from_supplied_clock() {
        let clock = crate::clock::ManualClock::new();
        clock.set_ms(5_000);
        let mut looper = AcquisitionLoop::new(test_settings(200))
            .unwrap()
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        let handle = looper.handle();
        let source = Box::new(|| -> MyoResult<Vec<f64>> { Ok(vec![1.0; 4]) });
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        looper.start(source, handler).unwrap();

        thread::sleep(Duration::from_millis(50));
        looper.stop().unwrap();

        // Stamps start from the clock's reading, not from zero.
        let last_us = {
            let state = handle.state.lock().unwrap();
            state.history.last_timestamp_us()
        };
        assert!(last_us >= 5_000_000, "last timestamp {} us", last_us);
    }

    #[test]
    fn test_concurrent_reads_see_consistent_history() {
        let settings = test_settings(100);
        let expected_len = settings.history_len();
        let mut looper = AcquisitionLoop::new(settings).unwrap();
        let handle = looper.handle();

        let mut n = 0.0f64;
        let source = Box::new(move || -> MyoResult<Vec<f64>> {
            n += 1.0;
            Ok(vec![n, n, n, n])
        });
        let handler: Arc<Mutex<dyn TickHandler>> = Arc::new(Mutex::new(PushHandler));
        looper.start(source, handler).unwrap();

        for _ in 0..50 {
            let snapshot = handle.history_snapshot();
            assert_eq!(snapshot.len(), 4);
            for series in &snapshot {
                assert_eq!(series.len(), expected_len);
            }
            // Samples carry the same value on every channel, so a torn
            // write would show up as disagreeing trailing values.
            let last: Vec<f64> = snapshot.iter().map(|s| s[expected_len - 1]).collect();
            assert!(last.iter().all(|&v| v == last[0]));
            thread::sleep(Duration::from_millis(2));
        }
        looper.stop().unwrap();
    }
}
