//! Runtime thresholds and feature flags for the engine.
//!
//! These are separate from the TOML-deserialized config in `feeder_config`;
//! see `conversions` for the bridge.
use core::fmt;
use core::str::FromStr;
use std::time::Duration;

use crate::error::EngineError;

/// Signal-conditioning thresholds shared by both channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// |w| below this snaps to exactly 0 g.
    pub zero_threshold_g: f64,
    /// Raw smoothing window length (samples).
    pub raw_window: usize,
    /// Accepted envelope is `[-max_weight_g, max_weight_g]`.
    pub max_weight_g: f64,
    /// Window entries whose distance from the window mean is not strictly
    /// below this are discarded before averaging.
    pub outlier_threshold_raw: f64,
    pub negative_streak_threshold: u32,
    pub auto_tare_cooldown: Duration,
    pub stability_threshold_g: f64,
    pub stability_count: u32,
    /// Global reading history capacity (all channels).
    pub history_capacity: usize,
    /// Number of same-channel history entries consulted by the range fallback.
    pub fallback_lookback: usize,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            zero_threshold_g: 3.0,
            raw_window: 5,
            max_weight_g: 500.0,
            outlier_threshold_raw: 100.0,
            negative_streak_threshold: 3,
            auto_tare_cooldown: Duration::from_secs(10),
            stability_threshold_g: 5.0,
            stability_count: 3,
            history_capacity: 100,
            fallback_lookback: 5,
            min_factor: 0.001,
            max_factor: 100_000.0,
        }
    }
}

/// A named pipeline stage toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    ZeroOffsets,
    StabilityTracking,
    AutoTare,
    WeightFiltering,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::ZeroOffsets,
        Feature::StabilityTracking,
        Feature::AutoTare,
        Feature::WeightFiltering,
    ];

    /// Stable external name, as used in config files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Feature::ZeroOffsets => "use_zero_offsets",
            Feature::StabilityTracking => "use_stability_tracking",
            Feature::AutoTare => "use_auto_tare",
            Feature::WeightFiltering => "use_weight_filtering",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| EngineError::UnknownFeature(s.to_string()))
    }
}

/// Pipeline stage toggles. Snapshotted by value at the start of every
/// pipeline run, so a concurrent change never splits a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub use_zero_offsets: bool,
    pub use_stability_tracking: bool,
    pub use_auto_tare: bool,
    pub use_weight_filtering: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_zero_offsets: true,
            use_stability_tracking: true,
            use_auto_tare: true,
            use_weight_filtering: true,
        }
    }
}

impl FeatureFlags {
    /// Every flag off; the pipeline reduces to divide, snap, round and range gate.
    pub fn none() -> Self {
        Self {
            use_zero_offsets: false,
            use_stability_tracking: false,
            use_auto_tare: false,
            use_weight_filtering: false,
        }
    }

    pub fn get(&self, feature: Feature) -> bool {
        match feature {
            Feature::ZeroOffsets => self.use_zero_offsets,
            Feature::StabilityTracking => self.use_stability_tracking,
            Feature::AutoTare => self.use_auto_tare,
            Feature::WeightFiltering => self.use_weight_filtering,
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        let slot = match feature {
            Feature::ZeroOffsets => &mut self.use_zero_offsets,
            Feature::StabilityTracking => &mut self.use_stability_tracking,
            Feature::AutoTare => &mut self.use_auto_tare,
            Feature::WeightFiltering => &mut self.use_weight_filtering,
        };
        *slot = enabled;
    }

    /// `(name, enabled)` pairs in a fixed order.
    pub fn entries(&self) -> [(&'static str, bool); 4] {
        Feature::ALL.map(|f| (f.name(), self.get(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_names_parse_back() {
        for f in Feature::ALL {
            assert_eq!(f.name().parse::<Feature>().unwrap(), f);
        }
    }

    #[test]
    fn unknown_feature_is_rejected_with_its_name() {
        let err = "use_turbo".parse::<Feature>().unwrap_err();
        assert_eq!(err, EngineError::UnknownFeature("use_turbo".into()));
    }

    #[test]
    fn set_touches_only_the_named_flag() {
        let mut flags = FeatureFlags::default();
        flags.set(Feature::AutoTare, false);
        assert!(!flags.use_auto_tare);
        assert!(flags.use_zero_offsets && flags.use_stability_tracking && flags.use_weight_filtering);
        assert_eq!(flags.entries()[2], ("use_auto_tare", false));
    }
}
