#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and sample-file parsing for the feeder scale engine.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the stock thresholds.
//! - The replay CSV loader enforces exact headers and rejects rows with an
//!   unknown channel before anything reaches the engine.
use serde::Deserialize;

/// Replay sample CSV schema.
///
/// Expected headers:
/// channel,raw,grams
///
/// `raw` and `grams` may be empty. Example:
/// channel,raw,grams
/// 1,84213,
/// 2,,12.5
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SampleRow {
    pub channel: u8,
    pub raw: Option<f64>,
    pub grams: Option<f64>,
}

/// Signal-conditioning thresholds. Defaults match the deployed feeder.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineCfg {
    /// Calibrated readings with |w| below this snap to exactly 0 g.
    pub zero_threshold_g: f64,
    /// Raw smoothing window (samples).
    pub raw_window: usize,
    /// Plausible weight envelope is [-max_weight_g, max_weight_g].
    pub max_weight_g: f64,
    /// Raw samples deviating from the window mean by this much are dropped.
    pub outlier_threshold_raw: f64,
    /// Consecutive negative readings before an automatic re-zero.
    pub negative_streak_threshold: u32,
    /// Minimum spacing between automatic re-zeros.
    pub auto_tare_cooldown_ms: u64,
    /// Readings closer than this to the stable value count as "similar".
    pub stability_threshold_g: f64,
    /// Similar readings required before a new plateau is accepted.
    pub stability_count: u32,
    /// Global reading history capacity (entries, all channels).
    pub history_capacity: usize,
    /// Accepted |factor| range for raw-based calibration.
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            zero_threshold_g: 3.0,
            raw_window: 5,
            max_weight_g: 500.0,
            outlier_threshold_raw: 100.0,
            negative_streak_threshold: 3,
            auto_tare_cooldown_ms: 10_000,
            stability_threshold_g: 5.0,
            stability_count: 3,
            history_capacity: 100,
            min_factor: 0.001,
            max_factor: 100_000.0,
        }
    }
}

/// Pipeline stage toggles at startup; they can be flipped at runtime.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FeaturesCfg {
    pub use_zero_offsets: bool,
    pub use_stability_tracking: bool,
    pub use_auto_tare: bool,
    pub use_weight_filtering: bool,
}

impl Default for FeaturesCfg {
    fn default() -> Self {
        Self {
            use_zero_offsets: true,
            use_stability_tracking: true,
            use_auto_tare: true,
            use_weight_filtering: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageCfg {
    /// Directory holding calibration.toml and history.csv (file backend).
    pub dir: String,
    pub backend: StorageBackend,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            dir: "var/feeder".to_string(),
            backend: StorageBackend::File,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub engine: EngineCfg,
    pub features: FeaturesCfg,
    pub storage: StorageCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let e = &self.engine;

        // Thresholds
        if !(e.zero_threshold_g.is_finite() && e.zero_threshold_g >= 0.0) {
            eyre::bail!("engine.zero_threshold_g must be a finite value >= 0");
        }
        if e.raw_window == 0 {
            eyre::bail!("engine.raw_window must be >= 1");
        }
        if e.raw_window > 1000 {
            eyre::bail!("engine.raw_window is unreasonably large (>1000)");
        }
        if !(e.max_weight_g.is_finite() && e.max_weight_g > 0.0) {
            eyre::bail!("engine.max_weight_g must be > 0");
        }
        if e.zero_threshold_g >= e.max_weight_g {
            eyre::bail!("engine.zero_threshold_g must be below engine.max_weight_g");
        }
        if !(e.outlier_threshold_raw.is_finite() && e.outlier_threshold_raw > 0.0) {
            eyre::bail!("engine.outlier_threshold_raw must be > 0");
        }
        if e.negative_streak_threshold == 0 {
            eyre::bail!("engine.negative_streak_threshold must be >= 1");
        }
        if e.auto_tare_cooldown_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("engine.auto_tare_cooldown_ms is unreasonably large (>24h)");
        }
        if !(e.stability_threshold_g.is_finite() && e.stability_threshold_g > 0.0) {
            eyre::bail!("engine.stability_threshold_g must be > 0");
        }
        if e.stability_count == 0 {
            eyre::bail!("engine.stability_count must be >= 1");
        }
        if e.history_capacity == 0 {
            eyre::bail!("engine.history_capacity must be >= 1");
        }
        if e.history_capacity > 100_000 {
            eyre::bail!("engine.history_capacity is unreasonably large (>100000)");
        }

        // Calibration bounds
        if !(e.min_factor.is_finite() && e.min_factor > 0.0) {
            eyre::bail!("engine.min_factor must be > 0");
        }
        if !(e.max_factor.is_finite() && e.max_factor > e.min_factor) {
            eyre::bail!("engine.max_factor must be greater than engine.min_factor");
        }

        // Storage
        if self.storage.backend == StorageBackend::File && self.storage.dir.trim().is_empty() {
            eyre::bail!("storage.dir must not be empty for the file backend");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}

/// Load replay samples from a CSV file with the exact header `channel,raw,grams`.
pub fn load_samples_csv(path: &std::path::Path) -> eyre::Result<Vec<SampleRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open samples CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["channel", "raw", "grams"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "samples CSV must have headers 'channel,raw,grams', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<SampleRow>().enumerate() {
        match rec {
            Ok(row) if matches!(row.channel, 1 | 2) => rows.push(row),
            Ok(row) => {
                eyre::bail!("invalid CSV row {}: unknown channel {}", idx + 2, row.channel);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}
