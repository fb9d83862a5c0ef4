//! Zero-offset ownership: manual tare, reset and offset application.
use feeder_traits::{CalibrationStore, Channel};

use crate::error::EngineError;
use crate::state::ChannelState;
use crate::store_error::map_store_error;

/// Subtract the zero offset when offsets are enabled. A disabled offset is
/// kept in state but not applied.
#[inline]
pub fn apply_offset(smoothed: f64, offset: f64, enabled: bool) -> f64 {
    if enabled { smoothed - offset } else { smoothed }
}

/// Zero the channel at its latest raw sample and raise the remote tare flag.
///
/// The in-memory offset is updated even when persisting it fails; the
/// failure is still returned.
pub(crate) fn tare(
    channel: Channel,
    state: &mut ChannelState,
    store: &dyn CalibrationStore,
) -> Result<f64, EngineError> {
    let raw = state
        .last_raw
        .ok_or(EngineError::NoRecentReading(channel))?;
    state.zero_offset = raw;
    state.remote_tare_pending = true;
    tracing::info!(%channel, offset = raw, "tare");

    store.save_offset(channel, raw).map_err(|e| {
        let err = map_store_error(e.as_ref());
        tracing::warn!(%channel, error = %err, "failed to persist zero offset");
        err
    })?;
    Ok(raw)
}

/// Clear the zero offset in memory and in the store. Idempotent.
pub(crate) fn reset_offset(
    channel: Channel,
    state: &mut ChannelState,
    store: &dyn CalibrationStore,
) -> Result<(), EngineError> {
    state.zero_offset = 0.0;
    tracing::info!(%channel, "zero offset reset");
    store.delete_offset(channel).map_err(|e| {
        let err = map_store_error(e.as_ref());
        tracing::warn!(%channel, error = %err, "failed to delete persisted zero offset");
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeder_store::MemoryStore;

    #[test]
    fn tare_without_raw_is_rejected() {
        let store = MemoryStore::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        assert_eq!(
            tare(Channel::One, &mut s, &store),
            Err(EngineError::NoRecentReading(Channel::One))
        );
        assert!(!s.remote_tare_pending);
    }

    #[test]
    fn tare_sets_and_persists_offset() {
        let store = MemoryStore::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        s.last_raw = Some(812.0);
        assert_eq!(tare(Channel::Two, &mut s, &store), Ok(812.0));
        assert_eq!(s.zero_offset, 812.0);
        assert!(s.remote_tare_pending);
        assert_eq!(store.offset(Channel::Two), Some(812.0));
    }

    #[test]
    fn failed_persist_still_updates_memory() {
        let store = MemoryStore::default();
        store.set_fail_writes(true);
        let mut s = ChannelState::new(5, Some(1.0), None);
        s.last_raw = Some(5.0);
        let err = tare(Channel::One, &mut s, &store).unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        assert_eq!(s.zero_offset, 5.0);
    }

    #[test]
    fn offset_only_applies_when_enabled() {
        assert_eq!(apply_offset(100.0, 30.0, true), 70.0);
        assert_eq!(apply_offset(100.0, 30.0, false), 100.0);
    }
}
