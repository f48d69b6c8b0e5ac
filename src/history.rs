//! Bounded per-device status history
//!
//! A fixed-capacity ring of [`HistorySample`]s. Appending beyond capacity
//! evicts the oldest sample; reads are chronological (oldest first), which is
//! the canonical order everywhere in this crate.

use std::collections::VecDeque;

use crate::HistorySample;

/// Ring buffer of past status samples for one device.
///
/// Eviction is FIFO and O(1) amortized; the length never exceeds the
/// capacity the ring was created with.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl HistoryRing {
    /// Create an empty ring holding at most `capacity` samples.
    ///
    /// A zero capacity is pinned to 1 so the ring always retains the latest
    /// sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn append(&mut self, sample: HistorySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// The most recent `limit` samples in chronological order.
    pub fn recent(&self, limit: usize) -> Vec<HistorySample> {
        let skip = self.samples.len().saturating_sub(limit);
        self.samples.iter().skip(skip).cloned().collect()
    }
}
