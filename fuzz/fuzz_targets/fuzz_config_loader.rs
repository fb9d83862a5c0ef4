#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = feeder_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A config that validates must also build an engine.
        let th: feeder_core::Thresholds = (&cfg.engine).into();
        let store = feeder_store::MemoryStore::new(th.history_capacity);
        let built = feeder_core::Engine::builder()
            .with_thresholds(th)
            .with_store(store)
            .build();
        assert!(built.is_ok(), "validated config rejected by builder: {built:?}");
    }
});
