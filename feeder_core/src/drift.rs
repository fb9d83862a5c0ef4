//! Auto-tare drift detector.
//!
//! A run of negative post-snap readings means the zero point has drifted
//! upward. Once the run reaches the streak threshold (and the cooldown has
//! passed) the channel is re-zeroed at the latest unsmoothed raw sample.
use std::time::Instant;

use crate::config::Thresholds;
use crate::state::ChannelState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftOutcome {
    /// Non-negative reading; streak cleared.
    Steady,
    /// Negative reading counted, no re-zero yet.
    Negative { streak: u32 },
    /// Offset moved to `new_offset`; streak cleared.
    AutoTared { new_offset: f64 },
}

/// Update the negative streak for post-snap weight `w` and re-zero if due.
pub(crate) fn observe(
    state: &mut ChannelState,
    w: f64,
    now: Instant,
    th: &Thresholds,
    auto_tare_enabled: bool,
) -> DriftOutcome {
    if w >= 0.0 {
        state.negative_streak = 0;
        return DriftOutcome::Steady;
    }
    state.negative_streak = state.negative_streak.saturating_add(1);
    let streak = state.negative_streak;

    let cooled = state
        .last_auto_tare_at
        .is_none_or(|t| now.saturating_duration_since(t) > th.auto_tare_cooldown);
    if auto_tare_enabled
        && streak >= th.negative_streak_threshold
        && cooled
        && let Some(raw) = state.last_raw
    {
        state.zero_offset = raw;
        state.last_auto_tare_at = Some(now);
        state.negative_streak = 0;
        return DriftOutcome::AutoTared { new_offset: raw };
    }
    DriftOutcome::Negative { streak }
}
