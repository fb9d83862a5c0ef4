//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "feeder", version, about = "Feeder scale conditioning and calibration CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON lines, and log as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Override a feature flag for this run, e.g. `use_auto_tare=off`.
    /// A bare name flips the configured value. Repeatable.
    #[arg(long = "feature", value_name = "NAME[=on|off]")]
    pub features: Vec<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Explicit on/off for `set-feature`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> Self {
        s == Switch::On
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Condition one sample from the remote unit
    Ingest {
        /// Channel id (1 or 2)
        #[arg(long)]
        channel: u8,
        /// Raw ADC sample
        #[arg(long, allow_negative_numbers = true)]
        raw: Option<f64>,
        /// Grams as reported by the remote unit (used while uncalibrated)
        #[arg(long, allow_negative_numbers = true)]
        grams: Option<f64>,
    },
    /// Condition one two-channel report
    Frame {
        #[arg(long, allow_negative_numbers = true)]
        raw1: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        raw2: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        grams1: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        grams2: Option<f64>,
    },
    /// Feed a `channel,raw,grams` CSV through the engine (Ctrl-C stops)
    Replay {
        /// Samples CSV (strict header)
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        /// Pause between samples
        #[arg(long, value_name = "MS", default_value_t = 0)]
        interval_ms: u64,
    },
    /// Zero a channel at its latest raw sample
    Tare {
        #[arg(long)]
        channel: u8,
        /// Ingest this raw sample first
        #[arg(long, allow_negative_numbers = true)]
        raw: Option<f64>,
    },
    /// Clear a channel's zero offset
    ResetOffset {
        #[arg(long)]
        channel: u8,
    },
    /// Derive the calibration factor from a known weight on the scale
    Calibrate {
        #[arg(long)]
        channel: u8,
        /// Reference weight in grams
        #[arg(long = "known-weight", value_name = "GRAMS", allow_negative_numbers = true)]
        known_weight: f64,
        /// Ingest this raw sample first
        #[arg(long, allow_negative_numbers = true)]
        raw: Option<f64>,
    },
    /// Force the factor so the current raw sample reads the target weight
    FixCalibration {
        #[arg(long)]
        channel: u8,
        #[arg(long, value_name = "GRAMS", default_value_t = feeder_core::DEFAULT_TARGET_WEIGHT_G)]
        target: f64,
        /// Ingest this raw sample first
        #[arg(long, allow_negative_numbers = true)]
        raw: Option<f64>,
    },
    /// Show per-channel calibration and weight state
    Status,
    /// Show the most recent readings, oldest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List feature flags and active thresholds
    Features,
    /// Set a feature flag, or flip it when no value is given
    SetFeature {
        name: String,
        #[arg(value_enum)]
        value: Option<Switch>,
    },
    /// Calibration diagnostics for both channels
    Diagnostics {
        #[arg(long, value_name = "GRAMS", default_value_t = feeder_core::DEFAULT_TARGET_WEIGHT_G)]
        target: f64,
    },
}
