//! Temporal buffer — the fixed-capacity FIFO of feature vectors the
//! sequence classifier consumes. Capacity equals the classifier's trained
//! sequence length and is fixed at construction.

use std::collections::VecDeque;

use crate::features::FEATURE_DIM;

/// Sequence length the bundled classifier was trained on.
pub const SEQUENCE_LEN: usize = 30;

/// Rolling window of the most recent feature vectors, oldest first.
#[derive(Debug)]
pub struct SequenceWindow {
    frames: VecDeque<[f32; FEATURE_DIM]>,
    capacity: usize,
}

impl SequenceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a feature vector, evicting the oldest once at capacity.
    pub fn push(&mut self, vector: [f32; FEATURE_DIM]) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(vector);
    }

    /// Drop all buffered frames. Called on hand loss past the reset
    /// threshold and on session disable.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the buffered sequence in chronological order, for
    /// handing to the classifier.
    pub fn snapshot(&self) -> Vec<[f32; FEATURE_DIM]> {
        self.frames.iter().copied().collect()
    }
}

impl Default for SequenceWindow {
    fn default() -> Self {
        Self::new(SEQUENCE_LEN)
    }
}

// ── Tests ──────────────────────────────────────────────────
