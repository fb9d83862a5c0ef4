#![no_main]
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

use feeder_core::{Channel, Engine, FeatureFlags};
use feeder_store::MemoryStore;

#[derive(Debug, Arbitrary)]
enum Op {
    Ingest { second: bool, raw: Option<f64>, grams: Option<f64> },
    Tare { second: bool },
    ResetOffset { second: bool },
    Calibrate { second: bool, known: f64 },
    Fix { second: bool, target: f64 },
    Toggle { feature: u8 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    factor: Option<f64>,
    flags: [bool; 4],
    ops: Vec<Op>,
}

fn channel(second: bool) -> Channel {
    if second { Channel::Two } else { Channel::One }
}

fuzz_target!(|input: Input| {
    let mut flags = FeatureFlags::none();
    for (feature, on) in feeder_core::Feature::ALL.into_iter().zip(input.flags) {
        flags.set(feature, on);
    }
    let store = MemoryStore::new(100).with_channel(Channel::One, input.factor, None);
    let Ok(engine) = Engine::builder().with_features(flags).with_store(store).build() else {
        return;
    };

    for op in input.ops.into_iter().take(256) {
        match op {
            Op::Ingest { second, raw, grams } => {
                let ch = channel(second);
                let before = engine.current_weight(ch);
                let res = engine.ingest(ch, raw, grams);
                assert!(res.persist_error.is_none());
                if raw.is_none_or(|r| !r.is_finite()) && grams.is_none_or(|g| !g.is_finite()) {
                    assert_eq!(res.weight_g.to_bits(), before.to_bits());
                }
                assert!(res.weight_g.is_finite());
            }
            Op::Tare { second } => {
                let _ = engine.tare(channel(second));
            }
            Op::ResetOffset { second } => {
                assert!(engine.reset_offset(channel(second)).is_ok());
            }
            Op::Calibrate { second, known } => {
                let _ = engine.calibrate(channel(second), known);
            }
            Op::Fix { second, target } => {
                let _ = engine.fix_calibration(channel(second), target);
            }
            Op::Toggle { feature } => {
                let f = feeder_core::Feature::ALL[usize::from(feature) % 4];
                let _ = engine.set_feature(f.name(), None);
            }
        }
    }
});
