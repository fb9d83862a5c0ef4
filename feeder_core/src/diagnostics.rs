//! Calibration diagnostics for a single channel.
use feeder_traits::Channel;

use crate::state::ChannelState;
use crate::types::ChannelDiagnostics;

/// Target weight used by fix-calibration and diagnostics when none is given.
pub const DEFAULT_TARGET_WEIGHT_G: f64 = 73.0;

pub(crate) fn channel_diagnostics(
    channel: Channel,
    state: &ChannelState,
    persisted_offset: Option<f64>,
    target_weight_g: f64,
) -> ChannelDiagnostics {
    let raw = state.last_raw;
    let offset = state.zero_offset;
    let calculated_weight_g = raw
        .zip(state.usable_factor())
        .map(|(r, f)| (r - offset) / f);
    let target_factor = raw
        .filter(|r| *r != 0.0)
        .filter(|_| target_weight_g != 0.0 && target_weight_g.is_finite())
        .map(|r| (r - offset) / target_weight_g);
    ChannelDiagnostics {
        channel,
        raw,
        factor: state.calibration_factor,
        offset,
        persisted_offset,
        calculated_weight_g,
        target_factor,
        state: state.snapshot(),
    }
}
