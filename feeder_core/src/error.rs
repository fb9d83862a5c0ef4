use feeder_traits::Channel;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// `Persistence` is soft: the in-memory update it accompanies has already
/// been applied when it is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("no recent raw reading for {0}")]
    NoRecentReading(Channel),
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("no reference weight on {0}: current reading is zero")]
    NoReference(Channel),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
    #[error("invalid channel: {0} (expected 1 or 2)")]
    InvalidChannel(u8),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing calibration store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Per-sample faults. These never leave the pipeline; they turn into
/// "keep the previous weight" at the engine boundary.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SampleError {
    #[error("raw sample is not finite: {0}")]
    NonFiniteRaw(f64),
    #[error("computed weight is not finite: {0}")]
    NonFiniteWeight(f64),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
