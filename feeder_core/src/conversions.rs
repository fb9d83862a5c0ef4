//! `From` implementations bridging `feeder_config` types to `feeder_core` types.

use std::time::Duration;

use crate::config::{FeatureFlags, Thresholds};

// ── Thresholds ───────────────────────────────────────────────────────────────

impl From<&feeder_config::EngineCfg> for Thresholds {
    fn from(c: &feeder_config::EngineCfg) -> Self {
        Self {
            zero_threshold_g: c.zero_threshold_g,
            raw_window: c.raw_window,
            max_weight_g: c.max_weight_g,
            outlier_threshold_raw: c.outlier_threshold_raw,
            negative_streak_threshold: c.negative_streak_threshold,
            auto_tare_cooldown: Duration::from_millis(c.auto_tare_cooldown_ms),
            stability_threshold_g: c.stability_threshold_g,
            stability_count: c.stability_count,
            history_capacity: c.history_capacity,
            min_factor: c.min_factor,
            max_factor: c.max_factor,
            ..Thresholds::default()
        }
    }
}

// ── FeatureFlags ─────────────────────────────────────────────────────────────

impl From<&feeder_config::FeaturesCfg> for FeatureFlags {
    fn from(c: &feeder_config::FeaturesCfg) -> Self {
        Self {
            use_zero_offsets: c.use_zero_offsets,
            use_stability_tracking: c.use_stability_tracking,
            use_auto_tare: c.use_auto_tare,
            use_weight_filtering: c.use_weight_filtering,
        }
    }
}
