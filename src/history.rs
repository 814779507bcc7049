//! Bounded sample history for live charting.

use std::collections::VecDeque;

use crate::model::ThroughputSample;

/// Fixed-capacity FIFO of recent throughput samples.
///
/// Holds at most `capacity` entries; pushing into a full buffer evicts the
/// oldest. The history is display-only and is cleared when a new throughput
/// phase begins.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<ThroughputSample>,
    capacity: usize,
}

impl SampleHistory {
    /// An empty history holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        SampleHistory {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if the buffer is full.
    pub fn push(&mut self, sample: ThroughputSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Drop all samples, keeping the capacity.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in arrival order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ThroughputSample> {
        self.samples.iter()
    }
}
