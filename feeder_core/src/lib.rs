#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Scale signal conditioning and calibration (storage-agnostic).
//!
//! Turns noisy, drifting raw load-cell samples from the two feeder channels
//! into stable calibrated weights. All persistence goes through
//! `feeder_traits::CalibrationStore`.
//!
//! ## Pipeline
//!
//! Per sample, under the channel's lock:
//!
//! - **Smoothing**: bounded raw window, outlier-filtered mean (`smoother`)
//! - **Zero offset**: manual tare and offset application (`tare`)
//! - **Division and snap**: raw units per gram, dead band around zero (`rounding`)
//! - **Drift**: sustained negative readings trigger an automatic re-zero (`drift`)
//! - **Gates**: range check with history-median fallback, then stability
//!   hysteresis (`gate`)
//!
//! Uncalibrated channels skip all of this and pass the remote unit's own
//! gram value through.
//!
//! ## Calibration
//!
//! `Engine::calibrate` picks between a raw-based and a reported-value
//! strategy (`calibration`); `Engine::fix_calibration` forces a factor for a
//! known target.

pub mod calibration;
pub mod config;
pub mod conversions;
pub mod diagnostics;
pub mod drift;
pub mod engine;
pub mod error;
pub mod gate;
pub mod history;
pub mod mocks;
pub mod pipeline;
pub mod rounding;
pub mod smoother;
pub mod state;
pub mod store_error;
pub mod tare;
pub mod types;

pub use config::{Feature, FeatureFlags, Thresholds};
pub use diagnostics::DEFAULT_TARGET_WEIGHT_G;
pub use engine::{Engine, EngineBuilder, parse_channel};
pub use error::{BuildError, EngineError, Result};
pub use feeder_traits::{Channel, Reading};
pub use state::ChannelSnapshot;
pub use types::{
    CalibratedWeight, ChannelDiagnostics, Diagnostics, FeatureReport, Frame, TareRequests,
    WeightSource,
};
