//! Fixed-length per-channel sample history
//!
//! The realtime loop is the only writer; readers obtain whole-vector
//! snapshots through the loop's shared-state lock, so the buffer itself
//! carries no synchronization.

use crate::error::{MyoError, MyoResult};
use crate::sample::Sample;
use std::collections::VecDeque;

/// Ring of the most recent N samples per channel.
///
/// Initialized full of zeros so its length is exactly N at all times; each
/// push evicts the oldest value of every channel and appends the newest as
/// one atomic (single-call) update.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    channels: Vec<VecDeque<f64>>,
    capacity: usize,
    last_timestamp_us: i64,
}

impl HistoryBuffer {
    /// Create a zero-filled history of `capacity` samples per channel
    pub fn new(channel_count: usize, capacity: usize) -> MyoResult<Self> {
        if channel_count == 0 || capacity == 0 {
            return Err(MyoError::config(
                "history buffer needs at least one channel and one sample",
            ));
        }

        let channels = vec![VecDeque::from(vec![0.0; capacity]); channel_count];
        Ok(HistoryBuffer {
            channels,
            capacity,
            last_timestamp_us: -1,
        })
    }

    /// Append one sample across all channels, evicting the oldest values.
    ///
    /// Rejects channel-count mismatches and non-monotonic timestamps; the
    /// caller must push samples in arrival order.
    pub fn push(&mut self, sample: &Sample) -> MyoResult<()> {
        if sample.channel_count() != self.channels.len() {
            return Err(MyoError::Configuration {
                reason: format!(
                    "sample has {} channels, history holds {}",
                    sample.channel_count(),
                    self.channels.len()
                ),
            });
        }
        if sample.timestamp_us() <= self.last_timestamp_us {
            return Err(MyoError::Configuration {
                reason: format!(
                    "non-monotonic timestamp {} after {}",
                    sample.timestamp_us(),
                    self.last_timestamp_us
                ),
            });
        }

        for (ring, &value) in self.channels.iter_mut().zip(sample.channels()) {
            ring.pop_front();
            ring.push_back(value);
        }
        self.last_timestamp_us = sample.timestamp_us();
        Ok(())
    }

    /// Reset every channel to zeros
    pub fn clear(&mut self) {
        for ring in &mut self.channels {
            ring.iter_mut().for_each(|v| *v = 0.0);
        }
        self.last_timestamp_us = -1;
    }

    /// Samples held per channel (constant after construction)
    pub fn len(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Timestamp of the newest sample, or -1 before the first push
    pub fn last_timestamp_us(&self) -> i64 {
        self.last_timestamp_us
    }

    /// Copy of one channel's series, oldest first
    pub fn channel_series(&self, channel: usize) -> MyoResult<Vec<f64>> {
        self.channels
            .get(channel)
            .map(|ring| ring.iter().copied().collect())
            .ok_or_else(|| MyoError::Configuration {
                reason: format!(
                    "channel index {} out of bounds (0-{})",
                    channel,
                    self.channels.len() - 1
                ),
            })
    }

    /// Copy of every channel's series, oldest first
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.channels
            .iter()
            .map(|ring| ring.iter().copied().collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_constant() {
        let mut history = HistoryBuffer::new(2, 4).unwrap();
        assert_eq!(history.len(), 4);

        for i in 0..10 {
            let sample = Sample::from_parts(vec![i as f64, -(i as f64)], i);
            history.push(&sample).unwrap();
            assert_eq!(history.channel_series(0).unwrap().len(), 4);
        }
    }

    #[test]
    fn test_fifo_eviction() {
        let mut history = HistoryBuffer::new(1, 3).unwrap();
        for i in 1..=5 {
            history
                .push(&Sample::from_parts(vec![i as f64], i))
                .unwrap();
        }
        assert_eq!(history.channel_series(0).unwrap(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_rejects_channel_mismatch() {
        let mut history = HistoryBuffer::new(2, 3).unwrap();
        let sample = Sample::from_parts(vec![1.0], 0);
        assert!(history.push(&sample).is_err());
    }

    #[test]
    fn test_rejects_non_monotonic_timestamp() {
        let mut history = HistoryBuffer::new(1, 3).unwrap();
        history.push(&Sample::from_parts(vec![1.0], 5)).unwrap();
        let stale = Sample::from_parts(vec![2.0], 5);
        assert!(matches!(
            history.push(&stale),
            Err(MyoError::Configuration { .. })
        ));
    }

    #[test]
    fn test_clear_resets_to_zero() {
        let mut history = HistoryBuffer::new(1, 2).unwrap();
        history.push(&Sample::from_parts(vec![9.0], 1)).unwrap();
        history.clear();
        assert_eq!(history.channel_series(0).unwrap(), vec![0.0, 0.0]);
        assert_eq!(history.last_timestamp_us(), -1);
    }
}
