use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use feeder_traits::{BoxError, CalibrationStore, Channel, Reading};

use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    factors: [Option<f64>; 2],
    offsets: [Option<f64>; 2],
    last_raw: [Option<f64>; 2],
    history: VecDeque<Reading>,
}

/// In-process store. History is capped like the file backend.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    history_capacity: usize,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MemoryStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            history_capacity: history_capacity.max(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Seed a calibration factor and offset as if a previous process had saved them.
    pub fn with_channel(self, channel: Channel, factor: Option<f64>, offset: Option<f64>) -> Self {
        if let Ok(mut g) = self.inner.lock() {
            g.factors[channel.index()] = factor;
            g.offsets[channel.index()] = offset;
        }
        self
    }

    /// Make every subsequent write fail with `StoreError::Injected`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn factor(&self, channel: Channel) -> Option<f64> {
        self.inner.lock().ok().and_then(|g| g.factors[channel.index()])
    }

    pub fn offset(&self, channel: Channel) -> Option<f64> {
        self.inner.lock().ok().and_then(|g| g.offsets[channel.index()])
    }

    pub fn last_raw(&self, channel: Channel) -> Option<f64> {
        self.inner.lock().ok().and_then(|g| g.last_raw[channel.index()])
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().map(|g| g.history.len()).unwrap_or(0)
    }

    fn write<F: FnOnce(&mut Inner)>(&self, f: F) -> Result<(), BoxError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Box::new(StoreError::Injected));
        }
        let mut g = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut g);
        Ok(())
    }

    fn read<T, F: FnOnce(&Inner) -> T>(&self, f: F) -> Result<T, BoxError> {
        let g = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&g))
    }
}

impl CalibrationStore for MemoryStore {
    fn load_calibration(&self, channel: Channel) -> Result<Option<f64>, BoxError> {
        self.read(|g| g.factors[channel.index()])
    }

    fn save_calibration(&self, channel: Channel, factor: f64) -> Result<(), BoxError> {
        self.write(|g| g.factors[channel.index()] = Some(factor))
    }

    fn load_offset(&self, channel: Channel) -> Result<Option<f64>, BoxError> {
        self.read(|g| g.offsets[channel.index()])
    }

    fn save_offset(&self, channel: Channel, offset: f64) -> Result<(), BoxError> {
        self.write(|g| g.offsets[channel.index()] = Some(offset))
    }

    fn delete_offset(&self, channel: Channel) -> Result<(), BoxError> {
        self.write(|g| g.offsets[channel.index()] = None)
    }

    fn load_last_raw(&self, channel: Channel) -> Result<Option<f64>, BoxError> {
        self.read(|g| g.last_raw[channel.index()])
    }

    fn save_last_raw(&self, channel: Channel, raw: f64) -> Result<(), BoxError> {
        self.write(|g| g.last_raw[channel.index()] = Some(raw))
    }

    fn append_history(&self, reading: &Reading) -> Result<(), BoxError> {
        let cap = self.history_capacity;
        self.write(|g| {
            g.history.push_back(reading.clone());
            while g.history.len() > cap {
                g.history.pop_front();
            }
        })
    }

    fn load_recent_history(&self, limit: usize) -> Result<Vec<Reading>, BoxError> {
        self.read(|g| {
            let skip = g.history.len().saturating_sub(limit);
            g.history.iter().skip(skip).cloned().collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(channel: Channel, w: f64) -> Reading {
        Reading {
            timestamp: Utc::now(),
            channel,
            weight_g: w,
            raw: None,
        }
    }

    #[test]
    fn history_is_capped_fifo() {
        let store = MemoryStore::new(3);
        for w in [1.0, 2.0, 3.0, 4.0] {
            store.append_history(&reading(Channel::One, w)).unwrap();
        }
        let hist = store.load_recent_history(10).unwrap();
        let ws: Vec<f64> = hist.iter().map(|r| r.weight_g).collect();
        assert_eq!(ws, vec![2.0, 3.0, 4.0]);
        let last_two = store.load_recent_history(2).unwrap();
        assert_eq!(last_two[0].weight_g, 3.0);
    }

    #[test]
    fn injected_failures_reject_writes_but_not_reads() {
        let store = MemoryStore::default().with_channel(Channel::Two, Some(10.0), Some(5.0));
        store.set_fail_writes(true);
        let err = store.save_offset(Channel::Two, 7.0).unwrap_err();
        assert!(err.to_string().contains("failure injection"));
        assert_eq!(store.load_offset(Channel::Two).unwrap(), Some(5.0));
        store.set_fail_writes(false);
        store.delete_offset(Channel::Two).unwrap();
        assert_eq!(store.offset(Channel::Two), None);
        assert_eq!(store.factor(Channel::Two), Some(10.0));
    }
}
