use std::collections::VecDeque;
use std::time::Instant;

/// Per-channel aggregate mutated by the pipeline and the tare/calibration
/// operations. Only ever touched under the channel's lock.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub(crate) last_raw: Option<f64>,
    pub(crate) raw_history: VecDeque<f64>,
    pub(crate) calibration_factor: Option<f64>,
    pub(crate) zero_offset: f64,
    pub(crate) current_weight: f64,
    pub(crate) negative_streak: u32,
    pub(crate) last_auto_tare_at: Option<Instant>,
    pub(crate) stable_weight: f64,
    pub(crate) stability_count: u32,
    /// First reading of a jump away from `stable_weight`, awaiting confirmation.
    pub(crate) stability_candidate: Option<f64>,
    /// Manual tare not yet picked up by the remote unit.
    pub(crate) remote_tare_pending: bool,
}

impl ChannelState {
    pub(crate) fn new(window: usize, factor: Option<f64>, offset: Option<f64>) -> Self {
        Self {
            last_raw: None,
            raw_history: VecDeque::with_capacity(window.min(64)),
            calibration_factor: factor,
            zero_offset: offset.unwrap_or(0.0),
            current_weight: 0.0,
            negative_streak: 0,
            last_auto_tare_at: None,
            stable_weight: 0.0,
            stability_count: 0,
            stability_candidate: None,
            remote_tare_pending: false,
        }
    }

    /// The factor when it can be used as a divisor.
    #[inline]
    pub(crate) fn usable_factor(&self) -> Option<f64> {
        self.calibration_factor
            .filter(|f| *f != 0.0 && f.is_finite())
    }

    pub(crate) fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            last_raw: self.last_raw,
            raw_history: self.raw_history.iter().copied().collect(),
            calibration_factor: self.calibration_factor,
            zero_offset: self.zero_offset,
            current_weight: self.current_weight,
            negative_streak: self.negative_streak,
            auto_tared: self.last_auto_tare_at.is_some(),
            stable_weight: self.stable_weight,
            stability_count: self.stability_count,
            stability_candidate: self.stability_candidate,
            remote_tare_pending: self.remote_tare_pending,
        }
    }
}

/// Read-only copy of one channel's state, for status output and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub last_raw: Option<f64>,
    pub raw_history: Vec<f64>,
    pub calibration_factor: Option<f64>,
    pub zero_offset: f64,
    pub current_weight: f64,
    pub negative_streak: u32,
    /// Whether an automatic re-zero has happened since startup.
    pub auto_tared: bool,
    pub stable_weight: f64,
    pub stability_count: u32,
    pub stability_candidate: Option<f64>,
    pub remote_tare_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_non_finite_factors_are_not_usable() {
        for f in [None, Some(0.0), Some(f64::NAN), Some(f64::INFINITY)] {
            assert_eq!(ChannelState::new(5, f, None).usable_factor(), None, "{f:?}");
        }
        assert_eq!(ChannelState::new(5, Some(-2.0), None).usable_factor(), Some(-2.0));
    }

    #[test]
    fn missing_offset_defaults_to_zero() {
        let s = ChannelState::new(5, Some(1.0), None);
        assert_eq!(s.zero_offset, 0.0);
        assert_eq!(s.current_weight, 0.0);
        assert!(s.raw_history.is_empty());
    }
}
