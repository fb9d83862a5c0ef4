//! Command execution: engine assembly, one function per subcommand, output rendering.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use feeder_config::{Config, StorageBackend};
use feeder_core::{CalibratedWeight, Engine, Frame, WeightSource, parse_channel};
use feeder_store::{FileStore, MemoryStore};
use feeder_traits::{CalibrationStore, Channel, Clock, MonotonicClock, Reading};
use serde_json::{Value, json};

use crate::cli::Commands;

/// Open the configured store and build the engine from the config sections.
pub fn build_engine(cfg: &Config) -> eyre::Result<Engine> {
    let store: Arc<dyn CalibrationStore> = match cfg.storage.backend {
        StorageBackend::File => Arc::new(
            FileStore::open(&cfg.storage.dir, cfg.engine.history_capacity)
                .wrap_err_with(|| format!("open storage at {}", cfg.storage.dir))?,
        ),
        StorageBackend::Memory => Arc::new(MemoryStore::new(cfg.engine.history_capacity)),
    };
    Engine::builder()
        .with_thresholds((&cfg.engine).into())
        .with_features((&cfg.features).into())
        .with_shared_store(store)
        .build()
}

/// Apply `--feature NAME[=on|off]` overrides. A bare name flips the flag.
pub fn apply_feature_overrides(engine: &Engine, overrides: &[String]) -> eyre::Result<()> {
    for spec in overrides {
        let (name, value) = match spec.split_once('=') {
            Some((name, v)) => (name.trim(), Some(parse_switch(v)?)),
            None => (spec.trim(), None),
        };
        engine.set_feature(name, value)?;
    }
    Ok(())
}

fn parse_switch(v: &str) -> eyre::Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => eyre::bail!("feature value must be on or off, got {other:?}"),
    }
}

pub fn run(engine: &Engine, cmd: Commands, json: bool) -> eyre::Result<()> {
    match cmd {
        Commands::Ingest {
            channel,
            raw,
            grams,
        } => {
            let ch = parse_channel(channel)?;
            let res = engine.ingest(ch, raw, grams);
            emit(json, weight_json(&res), || weight_line(&res));
        }
        Commands::Frame {
            raw1,
            raw2,
            grams1,
            grams2,
        } => {
            let frame = Frame {
                weight1_raw: raw1,
                weight2_raw: raw2,
                weight1_g: grams1,
                weight2_g: grams2,
            };
            for res in engine.ingest_frame(&frame) {
                emit(json, weight_json(&res), || weight_line(&res));
            }
        }
        Commands::Replay { file, interval_ms } => replay(engine, &file, interval_ms, json)?,
        Commands::Tare { channel, raw } => {
            let ch = parse_channel(channel)?;
            prime(engine, ch, raw);
            let offset = engine.tare(ch)?;
            let requested = engine.take_remote_tare_requests().get(ch);
            emit(
                json,
                json!({ "channel": ch.id(), "offset": offset, "remote_tare_requested": requested }),
                || format!("{ch} tared at raw offset {offset}"),
            );
        }
        Commands::ResetOffset { channel } => {
            let ch = parse_channel(channel)?;
            engine.reset_offset(ch)?;
            emit(json, json!({ "channel": ch.id(), "offset": 0.0 }), || {
                format!("{ch} offset reset")
            });
        }
        Commands::Calibrate {
            channel,
            known_weight,
            raw,
        } => {
            let ch = parse_channel(channel)?;
            prime(engine, ch, raw);
            let factor = engine.calibrate(ch, known_weight)?;
            emit(
                json,
                json!({ "channel": ch.id(), "factor": factor, "known_weight_g": known_weight }),
                || format!("{ch} calibration factor: {factor}"),
            );
        }
        Commands::FixCalibration {
            channel,
            target,
            raw,
        } => {
            let ch = parse_channel(channel)?;
            prime(engine, ch, raw);
            let factor = engine.fix_calibration(ch, target)?;
            emit(
                json,
                json!({ "channel": ch.id(), "factor": factor, "target_weight_g": target }),
                || format!("{ch} calibration factor: {factor} (reads {target} g)"),
            );
        }
        Commands::Status => {
            for ch in Channel::ALL {
                let s = engine.channel_state(ch);
                let value = json!({
                    "channel": ch.id(),
                    "factor": s.calibration_factor,
                    "offset": s.zero_offset,
                    "weight_g": s.current_weight,
                    "last_raw": s.last_raw,
                    "remote_tare_pending": s.remote_tare_pending,
                });
                emit(json, value, || {
                    let factor = s
                        .calibration_factor
                        .map_or_else(|| "uncalibrated".to_string(), |f| format!("factor {f}"));
                    format!(
                        "{ch}: {} g, {factor}, offset {}",
                        s.current_weight, s.zero_offset
                    )
                });
            }
        }
        Commands::History { limit } => {
            let readings = engine.recent_history(limit);
            if json {
                for r in &readings {
                    println!("{}", reading_json(r));
                }
            } else if readings.is_empty() {
                println!("no readings");
            } else {
                for r in &readings {
                    println!("{}", reading_line(r));
                }
            }
        }
        Commands::Features => {
            let report = engine.feature_report();
            let th = &report.thresholds;
            let flags: serde_json::Map<String, Value> = report
                .flags
                .entries()
                .into_iter()
                .map(|(name, on)| (name.to_string(), Value::Bool(on)))
                .collect();
            let value = json!({
                "flags": flags,
                "thresholds": {
                    "zero_threshold_g": th.zero_threshold_g,
                    "raw_window": th.raw_window,
                    "max_weight_g": th.max_weight_g,
                    "outlier_threshold_raw": th.outlier_threshold_raw,
                    "negative_streak_threshold": th.negative_streak_threshold,
                    "auto_tare_cooldown_ms": u64::try_from(th.auto_tare_cooldown.as_millis()).unwrap_or(u64::MAX),
                    "stability_threshold_g": th.stability_threshold_g,
                    "stability_count": th.stability_count,
                    "history_capacity": th.history_capacity,
                    "min_factor": th.min_factor,
                    "max_factor": th.max_factor,
                },
            });
            emit(json, value, || {
                let mut out = String::new();
                for (name, on) in report.flags.entries() {
                    out.push_str(&format!("{name}: {}\n", on_off(on)));
                }
                out.push_str(&format!(
                    "zero threshold {} g, window {}, max weight {} g, outlier threshold {} raw",
                    th.zero_threshold_g, th.raw_window, th.max_weight_g, th.outlier_threshold_raw
                ));
                out
            });
        }
        Commands::SetFeature { name, value } => {
            let enabled = engine.set_feature(&name, value.map(bool::from))?;
            emit(json, json!({ "feature": name, "enabled": enabled }), || {
                format!("{name}: {}", on_off(enabled))
            });
        }
        Commands::Diagnostics { target } => {
            let d = engine.diagnostics(target);
            if json {
                let channels: Vec<Value> = d
                    .channels
                    .iter()
                    .map(|c| {
                        json!({
                            "channel": c.channel.id(),
                            "raw": c.raw,
                            "factor": c.factor,
                            "offset": c.offset,
                            "persisted_offset": c.persisted_offset,
                            "calculated_weight_g": c.calculated_weight_g,
                            "target_factor": c.target_factor,
                            "weight_g": c.state.current_weight,
                        })
                    })
                    .collect();
                let readings: Vec<Value> = d.recent_readings.iter().map(reading_json).collect();
                let value = json!({
                    "target_weight_g": d.target_weight_g,
                    "channels": channels,
                    "recent_readings": readings,
                });
                println!("{value}");
            } else {
                for c in &d.channels {
                    println!(
                        "{}: raw {}, factor {}, offset {} (persisted {}), calculated {} g, factor for {} g: {}",
                        c.channel,
                        opt(c.raw),
                        opt(c.factor),
                        c.offset,
                        opt(c.persisted_offset),
                        opt(c.calculated_weight_g),
                        d.target_weight_g,
                        opt(c.target_factor),
                    );
                }
                println!("{} recent readings", d.recent_readings.len());
            }
        }
    }
    Ok(())
}

/// Ingest the `--raw` sample, if given, before tare or calibration.
fn prime(engine: &Engine, channel: Channel, raw: Option<f64>) {
    if raw.is_some() {
        let res = engine.ingest(channel, raw, None);
        tracing::debug!(%channel, weight_g = res.weight_g, "primed with raw sample");
    }
}

fn replay(engine: &Engine, file: &Path, interval_ms: u64, json: bool) -> eyre::Result<()> {
    let rows = feeder_config::load_samples_csv(file)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let clock = MonotonicClock::new();
    let pause = Duration::from_millis(interval_ms);
    let mut processed = 0usize;
    let mut unsaved = 0usize;
    for row in &rows {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(processed, "replay interrupted");
            break;
        }
        let ch = parse_channel(row.channel)?;
        let res = engine.ingest(ch, row.raw, row.grams);
        if res.persist_error.is_some() {
            unsaved += 1;
        }
        if json {
            println!("{}", weight_json(&res));
        }
        processed += 1;
        if !pause.is_zero() {
            clock.sleep(pause);
        }
    }

    let [w1, w2] = Channel::ALL.map(|ch| engine.current_weight(ch));
    emit(
        json,
        json!({
            "replayed": processed,
            "total": rows.len(),
            "unsaved": unsaved,
            "weight1_g": w1,
            "weight2_g": w2,
        }),
        || format!("replayed {processed}/{} samples; scale1 {w1} g, scale2 {w2} g", rows.len()),
    );
    Ok(())
}

fn emit(json: bool, value: Value, human: impl FnOnce() -> String) {
    if json {
        println!("{value}");
    } else {
        println!("{}", human());
    }
}

pub fn source_name(s: WeightSource) -> &'static str {
    match s {
        WeightSource::Conditioned => "conditioned",
        WeightSource::Reported => "reported",
        WeightSource::Retained => "retained",
    }
}

fn weight_json(res: &CalibratedWeight) -> Value {
    json!({
        "channel": res.channel.id(),
        "weight_g": res.weight_g,
        "source": source_name(res.source),
        "auto_tare_offset": res.auto_tare_offset,
        "persist_error": res.persist_error.as_ref().map(ToString::to_string),
    })
}

fn weight_line(res: &CalibratedWeight) -> String {
    let mut line = format!("{}: {} g ({})", res.channel, res.weight_g, source_name(res.source));
    if let Some(offset) = res.auto_tare_offset {
        line.push_str(&format!(", re-zeroed at {offset}"));
    }
    if let Some(e) = &res.persist_error {
        line.push_str(&format!(" [not saved: {e}]"));
    }
    line
}

fn reading_json(r: &Reading) -> Value {
    json!({
        "timestamp": r.timestamp.to_rfc3339(),
        "channel": r.channel.id(),
        "weight_g": r.weight_g,
        "raw": r.raw,
    })
}

fn reading_line(r: &Reading) -> String {
    format!(
        "{} {} {} g (raw {})",
        r.timestamp.to_rfc3339(),
        r.channel,
        r.weight_g,
        opt(r.raw)
    )
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| x.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Switch;
    use rstest::rstest;

    fn memory_engine() -> Engine {
        let cfg = feeder_config::load_toml("[storage]\nbackend = \"memory\"\n").unwrap();
        build_engine(&cfg).unwrap()
    }

    #[rstest]
    #[case("use_auto_tare=off", false)]
    #[case("use_auto_tare=ON", true)]
    #[case("use_auto_tare = 0", false)]
    #[case("use_auto_tare", false)]
    fn overrides_set_or_flip(#[case] spec: &str, #[case] expected: bool) {
        let engine = memory_engine();
        apply_feature_overrides(&engine, &[spec.to_string()]).unwrap();
        assert_eq!(engine.features().get(feeder_core::Feature::AutoTare), expected);
    }

    #[test]
    fn override_rejects_unknown_names_and_values() {
        let engine = memory_engine();
        let err = apply_feature_overrides(&engine, &["nope=on".to_string()]).unwrap_err();
        assert!(err.downcast_ref::<feeder_core::EngineError>().is_some());
        assert!(apply_feature_overrides(&engine, &["use_auto_tare=maybe".to_string()]).is_err());
    }

    #[test]
    fn weight_line_mentions_source_and_rezero() {
        let res = CalibratedWeight {
            channel: Channel::Two,
            weight_g: 0.0,
            source: WeightSource::Conditioned,
            auto_tare_offset: Some(-120.0),
            persist_error: None,
        };
        assert_eq!(weight_line(&res), "scale2: 0 g (conditioned), re-zeroed at -120");
    }

    #[test]
    fn switch_converts_to_bool() {
        assert!(bool::from(Switch::On));
        assert!(!bool::from(Switch::Off));
    }
}
