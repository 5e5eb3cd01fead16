//! Classifier-output post-processing
//!
//! Stabilizes raw per-tick class scores with majority voting over a
//! trailing window of decisions and/or a bounded velocity ramp. When both
//! are enabled the vote runs first, then the ramp.

use myoflow_core::{MyoError, MyoResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Index of the highest score; ties go to the lowest index
pub fn arg_max(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// Majority vote over the last K predicted classes.
///
/// The FIFO starts filled with class 0, so the output is well defined from
/// the first tick. Modal ties go to the lowest class index (ascending scan,
/// strictly-greater replacement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorityVote {
    buffer: VecDeque<usize>,
    class_count: usize,
}

impl MajorityVote {
    pub fn new(vote_len: usize, class_count: usize) -> MyoResult<Self> {
        if vote_len == 0 || class_count == 0 {
            return Err(MyoError::config(
                "majority vote needs a positive buffer length and class count",
            ));
        }
        Ok(MajorityVote {
            buffer: VecDeque::from(vec![0; vote_len]),
            class_count,
        })
    }

    /// Insert the scores' arg-max class, evict the oldest decision, and
    /// return a one-hot vector at the modal class
    pub fn process(&mut self, scores: &[f64]) -> Vec<f64> {
        self.buffer.pop_front();
        self.buffer.push_back(arg_max(scores).min(self.class_count - 1));

        let mut counts = vec![0usize; self.class_count];
        for &class in &self.buffer {
            counts[class] += 1;
        }
        let modal = arg_max_usize(&counts);

        let mut one_hot = vec![0.0; self.class_count];
        one_hot[modal] = 1.0;
        one_hot
    }

    /// Recent decisions, oldest first (for inspection/tests)
    pub fn decisions(&self) -> Vec<usize> {
        self.buffer.iter().copied().collect()
    }
}

fn arg_max_usize(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &count) in counts.iter().enumerate().skip(1) {
        if count > counts[best] {
            best = i;
        }
    }
    best
}

/// Bounded incremental move toward the winning class.
///
/// Each class keeps a level in [0, 1]; every tick the winner gains
/// `increment` and every other class loses it. The output is the level
/// vector, not one-hot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityRamp {
    levels: Vec<f64>,
    increment: f64,
}

impl VelocityRamp {
    pub fn new(class_count: usize, increment: f64) -> MyoResult<Self> {
        if class_count == 0 {
            return Err(MyoError::config("velocity ramp needs at least one class"));
        }
        if !(0.0..=1.0).contains(&increment) || increment == 0.0 {
            return Err(MyoError::config(
                "velocity ramp increment must lie in (0, 1]",
            ));
        }
        Ok(VelocityRamp {
            levels: vec![0.0; class_count],
            increment,
        })
    }

    pub fn process(&mut self, scores: &[f64]) -> Vec<f64> {
        let winner = arg_max(scores).min(self.levels.len() - 1);
        for (i, level) in self.levels.iter_mut().enumerate() {
            if i == winner {
                *level = (*level + self.increment).min(1.0);
            } else {
                *level = (*level - self.increment).max(0.0);
            }
        }
        self.levels.clone()
    }
}

/// Composition of the two smoothers; either can be disabled independently
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostProcessor {
    vote: Option<MajorityVote>,
    ramp: Option<VelocityRamp>,
}

impl PostProcessor {
    /// Pass-through post-processor
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_majority_vote(mut self, vote_len: usize, class_count: usize) -> MyoResult<Self> {
        self.vote = Some(MajorityVote::new(vote_len, class_count)?);
        Ok(self)
    }

    pub fn with_velocity_ramp(mut self, class_count: usize, increment: f64) -> MyoResult<Self> {
        self.ramp = Some(VelocityRamp::new(class_count, increment)?);
        Ok(self)
    }

    /// Smooth one raw score vector. Vote first, then ramp, fixed order.
    pub fn process(&mut self, scores: &[f64]) -> Vec<f64> {
        let mut current = scores.to_vec();
        if let Some(vote) = &mut self.vote {
            current = vote.process(&current);
        }
        if let Some(ramp) = &mut self.ramp {
            current = ramp.process(&current);
        }
        current
    }
}
