//! Per-sample conditioning pipeline.
//!
//! smooth → offset → divide → snap → drift → round → range gate → stability gate
//!
//! Runs entirely on one `ChannelState` under that channel's lock. The range
//! gate's history lookup is passed in as a closure so this module stays
//! independent of how the global history is shared.
use std::time::Instant;

use feeder_traits::Channel;

use crate::config::{FeatureFlags, Thresholds};
use crate::drift::{self, DriftOutcome};
use crate::error::SampleError;
use crate::gate::{self, StabilityOutcome};
use crate::rounding::{round_weight, snap};
use crate::smoother;
use crate::state::ChannelState;
use crate::tare::apply_offset;

/// Outcome of conditioning one raw sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditioned {
    pub weight_g: f64,
    pub auto_tare_offset: Option<f64>,
    /// The computed value was out of range and a history median replaced it.
    pub range_fallback: bool,
    pub stability: StabilityOutcome,
}

#[inline]
fn finite(w: f64) -> Result<f64, SampleError> {
    if w.is_finite() { Ok(w) } else { Err(SampleError::NonFiniteWeight(w)) }
}

/// Condition one raw sample for a calibrated channel.
///
/// `state.last_raw` must already hold `raw`. `factor` must be a usable
/// divisor. `recent_weights(n)` returns the newest `n` visible weights
/// recorded for this channel.
#[allow(clippy::too_many_arguments)]
pub(crate) fn condition<F>(
    channel: Channel,
    state: &mut ChannelState,
    raw: f64,
    factor: f64,
    th: &Thresholds,
    flags: FeatureFlags,
    now: Instant,
    recent_weights: F,
) -> Result<Conditioned, SampleError>
where
    F: FnOnce(usize) -> Vec<f64>,
{
    if !raw.is_finite() {
        return Err(SampleError::NonFiniteRaw(raw));
    }

    let smoothed = smoother::smooth(
        &mut state.raw_history,
        raw,
        th.raw_window,
        th.outlier_threshold_raw,
        flags.use_weight_filtering,
    );
    let mut w = finite(apply_offset(smoothed, state.zero_offset, flags.use_zero_offsets) / factor)?;
    w = snap(w, th.zero_threshold_g);
    if w == 0.0 {
        tracing::debug!(%channel, "below zero threshold, snapped");
    }

    let mut auto_tare_offset = None;
    match drift::observe(state, w, now, th, flags.use_auto_tare) {
        DriftOutcome::AutoTared { new_offset } => {
            tracing::info!(%channel, offset = new_offset, "auto-tare");
            auto_tare_offset = Some(new_offset);
            w = finite(apply_offset(smoothed, new_offset, flags.use_zero_offsets) / factor)?;
            w = snap(w, th.zero_threshold_g);
        }
        DriftOutcome::Negative { streak } => {
            tracing::debug!(%channel, streak, weight_g = w, "negative reading");
        }
        DriftOutcome::Steady => {}
    }

    w = round_weight(w);

    let mut range_fallback = false;
    if !gate::in_range(w, th.max_weight_g) {
        let candidates = recent_weights(th.fallback_lookback);
        match gate::fallback_median(&candidates, th.max_weight_g) {
            Some(median) => {
                tracing::debug!(%channel, rejected = w, median, "out of range, using history median");
                w = median;
                range_fallback = true;
            }
            None => {
                tracing::debug!(%channel, rejected = w, kept = state.current_weight, "out of range, no history, keeping previous");
                w = state.current_weight;
            }
        }
    }

    let mut stability = StabilityOutcome::Pass;
    if flags.use_stability_tracking {
        let (visible, outcome) = gate::stability_gate(state, w, th);
        if let StabilityOutcome::Held { stable_weight } = outcome {
            tracing::debug!(%channel, candidate = w, stable_weight, "unstable, holding plateau");
        }
        w = visible;
        stability = outcome;
    }

    Ok(Conditioned {
        weight_g: w,
        auto_tare_offset,
        range_fallback,
        stability,
    })
}
