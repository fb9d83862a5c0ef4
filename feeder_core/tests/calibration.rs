use std::sync::Arc;

use feeder_core::{Channel, Engine, EngineError, FeatureFlags, WeightSource};
use feeder_store::MemoryStore;

fn engine(store: &Arc<MemoryStore>) -> Engine {
    Engine::builder()
        .with_shared_store(store.clone())
        .build()
        .unwrap()
}

#[test]
fn calibration_round_trip() {
    let store = Arc::new(MemoryStore::default());
    let e = engine(&store);

    // uncalibrated: the remote unit's grams are shown as-is
    let r = e.ingest(Channel::One, Some(1000.0), Some(0.0));
    assert_eq!(r.source, WeightSource::Reported);

    assert_eq!(e.calibrate(Channel::One, 100.0), Ok(10.0));
    assert_eq!(store.factor(Channel::One), Some(10.0));

    let r = e.ingest(Channel::One, Some(1000.0), None);
    assert_eq!(r.source, WeightSource::Conditioned);
    assert_eq!(r.weight_g, 100.0);
}

#[test]
fn calibration_after_restart_uses_persisted_raw() {
    let store = Arc::new(MemoryStore::default());
    engine(&store).ingest(Channel::Two, Some(2500.0), Some(12.0));
    assert_eq!(store.last_raw(Channel::Two), Some(2500.0));

    let e = engine(&store);
    assert_eq!(e.channel_state(Channel::Two).last_raw, None);
    assert_eq!(e.calibrate(Channel::Two, 250.0), Ok(10.0));
}

#[test]
fn offset_is_removed_before_computing_the_factor() {
    let store = Arc::new(MemoryStore::default().with_channel(Channel::One, None, Some(200.0)));
    let e = engine(&store);
    e.ingest(Channel::One, Some(1200.0), None);
    assert_eq!(e.calibrate(Channel::One, 50.0), Ok(20.0));
}

#[test]
fn without_any_raw_the_reported_weight_is_the_reference() {
    let store = Arc::new(MemoryStore::default());
    let e = engine(&store);
    e.ingest(Channel::Two, None, Some(40.0));
    assert_eq!(e.current_weight(Channel::Two), 40.0);
    assert_eq!(e.calibrate(Channel::Two, 80.0), Ok(0.5));
}

#[test]
fn no_raw_and_zero_weight_has_no_reference() {
    let store = Arc::new(MemoryStore::default());
    let e = engine(&store);
    assert_eq!(
        e.calibrate(Channel::One, 100.0),
        Err(EngineError::NoReference(Channel::One))
    );
    assert_eq!(store.factor(Channel::One), None);
}

#[test]
fn rejected_calibration_leaves_the_factor_alone() {
    let store = Arc::new(MemoryStore::default().with_channel(Channel::One, Some(7.0), None));
    let e = engine(&store);
    e.ingest(Channel::One, Some(0.0), None);

    let err = e.calibrate(Channel::One, 100.0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidCalibration(_)), "{err:?}");
    let err = e.calibrate(Channel::One, 0.0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidCalibration(_)), "{err:?}");

    assert_eq!(e.calibration_factors()[0], (Channel::One, Some(7.0)));
    assert_eq!(store.factor(Channel::One), Some(7.0));
}

#[test]
fn recalibration_overwrites() {
    let store = Arc::new(MemoryStore::default());
    let e = engine(&store);
    e.ingest(Channel::One, Some(1000.0), None);
    e.calibrate(Channel::One, 100.0).unwrap();
    e.calibrate(Channel::One, 50.0).unwrap();
    assert_eq!(e.calibration_factors()[0].1, Some(20.0));
    assert_eq!(store.factor(Channel::One), Some(20.0));
}

#[test]
fn failed_save_still_applies_the_factor() {
    let store = Arc::new(MemoryStore::default());
    let e = engine(&store);
    e.ingest(Channel::One, Some(1000.0), None);
    store.set_fail_writes(true);
    let err = e.calibrate(Channel::One, 100.0).unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)), "{err:?}");
    assert_eq!(e.calibration_factors()[0].1, Some(10.0));
}

#[test]
fn fix_calibration_targets_the_given_weight() {
    let store = Arc::new(MemoryStore::default().with_channel(Channel::Two, Some(3.0), Some(100.0)));
    let e = Engine::builder()
        .with_shared_store(store.clone())
        .with_features(FeatureFlags::none())
        .build()
        .unwrap();
    assert_eq!(
        e.fix_calibration(Channel::Two, 73.0),
        Err(EngineError::NoRecentReading(Channel::Two))
    );

    e.ingest(Channel::Two, Some(830.0), None);
    assert_eq!(e.fix_calibration(Channel::Two, 73.0), Ok(10.0));
    assert_eq!(store.factor(Channel::Two), Some(10.0));
    // offsets are not applied with every feature off: 830 / 10
    assert_eq!(e.ingest(Channel::Two, Some(830.0), None).weight_g, 83.0);
}
