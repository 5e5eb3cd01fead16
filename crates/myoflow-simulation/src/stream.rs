//! Async streaming wrapper around the synthetic source
//!
//! Generates fixed-length chunks of timestamped samples on a tokio
//! interval and fans them out over a broadcast channel; an mpsc control
//! channel drives start/stop and pattern changes.

use crate::generator::{SyntheticConfig, SyntheticSource};
use crate::patterns::ActivationPattern;
use myoflow_core::{MyoResult, Sample};
use myoflow_realtime::SampleSource;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub source: SyntheticConfig,
    /// Samples per published chunk
    pub chunk_len: usize,
    /// Chunks kept in the broadcast buffer for slow subscribers
    pub buffer_size: usize,
    /// Publishing rate in Hz
    pub update_rate_hz: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            source: SyntheticConfig::default(),
            chunk_len: 100,
            buffer_size: 50,
            update_rate_hz: 10.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StreamCommand {
    Start,
    Stop,
    SetPattern(ActivationPattern),
    SetLevel(f64),
}

/// Chunk-producing stream task state
pub struct SampleStream {
    config: StreamConfig,
    source: SyntheticSource,
    data_sender: broadcast::Sender<Vec<Sample>>,
    control_receiver: mpsc::Receiver<StreamCommand>,
    control_sender: mpsc::Sender<StreamCommand>,
    running: bool,
    sample_index: u64,
}

impl SampleStream {
    pub fn new(config: StreamConfig) -> MyoResult<Self> {
        let source = SyntheticSource::new(config.source.clone())?;
        let (data_sender, _) = broadcast::channel(config.buffer_size.max(1));
        let (control_sender, control_receiver) = mpsc::channel(32);

        Ok(SampleStream {
            config,
            source,
            data_sender,
            control_receiver,
            control_sender,
            running: false,
            sample_index: 0,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Sample>> {
        self.data_sender.subscribe()
    }

    pub fn control_handle(&self) -> mpsc::Sender<StreamCommand> {
        self.control_sender.clone()
    }

    fn next_chunk(&mut self) -> MyoResult<Vec<Sample>> {
        let period_us = 1_000_000.0 / self.config.source.sampling_rate_hz;
        let mut chunk = Vec::with_capacity(self.config.chunk_len);
        for _ in 0..self.config.chunk_len {
            let values = self.source.pull()?;
            let timestamp_us = (self.sample_index as f64 * period_us) as i64;
            self.sample_index += 1;
            chunk.push(Sample::from_parts(values, timestamp_us));
        }
        Ok(chunk)
    }

    /// Run the stream until the control channel closes
    pub async fn run(&mut self) -> MyoResult<()> {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / self.config.update_rate_hz));
        info!(
            update_rate_hz = self.config.update_rate_hz,
            chunk_len = self.config.chunk_len,
            "sample stream task started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.running {
                        continue;
                    }
                    let chunk = self.next_chunk()?;
                    debug!(samples = chunk.len(), "chunk published");
                    // No subscribers is fine
                    let _ = self.data_sender.send(chunk);
                }

                command = self.control_receiver.recv() => {
                    match command {
                        Some(StreamCommand::Start) => {
                            self.running = true;
                            info!("sample stream started");
                        }
                        Some(StreamCommand::Stop) => {
                            self.running = false;
                            self.source.reset_time();
                            self.sample_index = 0;
                            info!("sample stream stopped");
                        }
                        Some(StreamCommand::SetPattern(pattern)) => {
                            info!(pattern = pattern.description(), "pattern updated");
                            self.source.set_pattern(pattern);
                        }
                        Some(StreamCommand::SetLevel(level)) => {
                            info!(level, "activation level set");
                            self.source.set_pattern(ActivationPattern::Constant { level });
                        }
                        None => {
                            warn!("control channel closed, stream task exiting");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Spawn a stream task in the background and hand back its channels
pub fn start_sample_stream(
    config: StreamConfig,
) -> MyoResult<(broadcast::Receiver<Vec<Sample>>, mpsc::Sender<StreamCommand>)> {
    let mut stream = SampleStream::new(config)?;
    let data_receiver = stream.subscribe();
    let control_sender = stream.control_handle();

    tokio::spawn(async move {
        if let Err(err) = stream.run().await {
            warn!(error = %err, "sample stream task failed");
        }
    });

    Ok((data_receiver, control_sender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn fast_config() -> StreamConfig {
        StreamConfig {
            source: SyntheticConfig {
                seed: Some(9),
                ..SyntheticConfig::default()
            },
            chunk_len: 50,
            buffer_size: 16,
            update_rate_hz: 50.0,
        }
    }

    #[tokio::test]
    async fn test_stream_publishes_chunks() {
        let (mut receiver, control) = start_sample_stream(fast_config()).unwrap();
        control.send(StreamCommand::Start).await.unwrap();

        let chunk = receiver.recv().await.unwrap();
        assert_eq!(chunk.len(), 50);
        assert_eq!(chunk[0].channel_count(), 4);

        // Timestamps advance monotonically across chunks
        let next = receiver.recv().await.unwrap();
        assert!(next[0].timestamp_us() > chunk[chunk.len() - 1].timestamp_us());

        control.send(StreamCommand::Stop).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_resets_timestamps() {
        let (mut receiver, control) = start_sample_stream(fast_config()).unwrap();
        control.send(StreamCommand::Start).await.unwrap();
        let first = receiver.recv().await.unwrap();
        assert_eq!(first[0].timestamp_us(), 0);

        control.send(StreamCommand::Stop).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        // Drain anything published before the stop landed
        while receiver.try_recv().is_ok() {}

        control.send(StreamCommand::Start).await.unwrap();
        let restarted = receiver.recv().await.unwrap();
        assert_eq!(restarted[0].timestamp_us(), 0);

        control.send(StreamCommand::Stop).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_chunks_before_start() {
        let (mut receiver, _control) = start_sample_stream(fast_config()).unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(receiver.try_recv().is_err());
    }
}
