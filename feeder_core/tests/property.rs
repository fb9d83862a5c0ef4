use std::collections::VecDeque;
use std::sync::Arc;

use feeder_core::smoother::smooth;
use feeder_core::{Channel, Engine, FeatureFlags, WeightSource};
use feeder_store::MemoryStore;
use proptest::prelude::*;

fn engine(factor: f64, flags: FeatureFlags) -> Engine {
    Engine::builder()
        .with_shared_store(Arc::new(
            MemoryStore::default().with_channel(Channel::One, Some(factor), None),
        ))
        .with_features(flags)
        .build()
        .unwrap()
}

prop_compose! {
    fn flags_strategy()(
        offsets in any::<bool>(),
        stability in any::<bool>(),
        auto_tare in any::<bool>(),
        filtering in any::<bool>(),
    ) -> FeatureFlags {
        FeatureFlags {
            use_zero_offsets: offsets,
            use_stability_tracking: stability,
            use_auto_tare: auto_tare,
            use_weight_filtering: filtering,
        }
    }
}

proptest! {
    #[test]
    fn smoothed_value_stays_within_window_bounds(
        raws in prop::collection::vec(-1.0e6f64..1.0e6, 1..30),
        filtering in any::<bool>(),
    ) {
        let mut window = VecDeque::new();
        for raw in raws {
            let v = smooth(&mut window, raw, 5, 100.0, filtering);
            prop_assert!(window.len() <= 5);
            let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "{v} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn tight_window_smooths_to_its_exact_mean(
        base in -1.0e5f64..1.0e5,
        offsets in prop::collection::vec(-40.0f64..40.0, 5),
    ) {
        // spread is under 80, so no sample is ever 100 away from the mean
        let mut window = VecDeque::new();
        let mut seen = Vec::new();
        for off in offsets {
            let raw = base + off;
            seen.push(raw);
            let v = smooth(&mut window, raw, 5, 100.0, true);
            let mean = seen.iter().sum::<f64>() / seen.len() as f64;
            prop_assert!((v - mean).abs() <= 1e-9 * mean.abs().max(1.0), "{v} vs {mean}");
        }
        prop_assert_eq!(window.len(), 5);
    }

    #[test]
    fn visible_weight_is_snapped_and_bounded(
        raws in prop::collection::vec(-2.0e4f64..2.0e4, 1..60),
        factor in prop_oneof![0.05f64..50.0, -50.0f64..-0.05],
        flags in flags_strategy(),
    ) {
        let e = engine(factor, flags);
        for raw in raws {
            let r = e.ingest(Channel::One, Some(raw), None);
            prop_assert_eq!(r.source, WeightSource::Conditioned);
            prop_assert!(r.weight_g == 0.0 || r.weight_g.abs() >= 3.0, "{}", r.weight_g);
            prop_assert!((-500.0..=500.0).contains(&r.weight_g), "{}", r.weight_g);
            prop_assert!(e.channel_state(Channel::One).raw_history.len() <= 5);
        }
        prop_assert!(e.recent_history(1_000).len() <= 100);
    }

    #[test]
    fn malformed_samples_keep_the_previous_weight(
        good in -400.0f64..400.0,
        bad in prop_oneof![
            Just(Some(f64::NAN)),
            Just(Some(f64::INFINITY)),
            Just(Some(f64::NEG_INFINITY)),
            Just(None),
        ],
        reported in prop::option::of(-1.0e3f64..1.0e3),
    ) {
        let e = engine(1.0, FeatureFlags::none());
        let before = e.ingest(Channel::One, Some(good), None).weight_g;
        let after = e.ingest(Channel::One, bad, reported);
        prop_assert_eq!(after.weight_g, before);
        prop_assert_eq!(after.source, WeightSource::Retained);
    }

    #[test]
    fn calibrate_then_read_back_the_known_weight(
        raw in 100.0f64..1.0e5,
        known in 10.0f64..400.0,
    ) {
        let e = Engine::builder()
            .with_store(MemoryStore::default())
            .with_features(FeatureFlags::none())
            .build()
            .unwrap();
        e.ingest(Channel::Two, Some(raw), None);
        let factor = e.calibrate(Channel::Two, known).unwrap();
        prop_assert!((factor - raw / known).abs() < 1e-9 * factor.abs().max(1.0));
        let w = e.ingest(Channel::Two, Some(raw), None).weight_g;
        prop_assert!((w - known).abs() <= 0.5, "{w} vs {known}");
    }
}
