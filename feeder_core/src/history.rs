use std::collections::VecDeque;

use feeder_traits::{Channel, Reading};

/// Upper bound on up-front allocation; larger histories grow on demand.
const PREALLOC_LIMIT: usize = 1024;

/// Global bounded reading history shared by both channels.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Reading>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    /// Seed from persisted readings (oldest first), keeping the newest `capacity`.
    pub fn restore(capacity: usize, readings: impl IntoIterator<Item = Reading>) -> Self {
        let mut h = Self::new(capacity);
        for r in readings {
            h.push(r);
        }
        h
    }

    pub fn push(&mut self, reading: Reading) {
        self.entries.push_back(reading);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest `limit` readings, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Reading> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Weights of the newest `n` readings recorded for `channel`, oldest first.
    pub fn recent_weights(&self, channel: Channel, n: usize) -> Vec<f64> {
        let mut out: Vec<f64> = self
            .entries
            .iter()
            .rev()
            .filter(|r| r.channel == channel)
            .take(n)
            .map(|r| r.weight_g)
            .collect();
        out.reverse();
        out
    }
}
