//! Raw-to-grams factor resolution.
//!
//! Two strategies, picked by what is available for the channel:
//! - `FromRaw`: a raw sample exists (in memory or persisted). The factor is
//!   `(raw - offset) / known` and must fall inside the configured bounds.
//! - `FromReported`: no raw sample at all. The factor is
//!   `current_weight / known`, so that the current visible reading maps
//!   onto the known weight. No offset correction, no bounds check.
use feeder_traits::Channel;

use crate::config::Thresholds;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStrategy {
    FromRaw { raw: f64, offset: f64 },
    FromReported { current_weight: f64 },
}

impl CalibrationStrategy {
    /// Choose the strategy by precondition: any known raw sample wins.
    pub fn select(raw: Option<f64>, offset: f64, current_weight: f64) -> Self {
        match raw {
            Some(raw) => Self::FromRaw { raw, offset },
            None => Self::FromReported { current_weight },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FromRaw { .. } => "raw",
            Self::FromReported { .. } => "reported",
        }
    }

    pub fn factor(
        &self,
        channel: Channel,
        known_weight_g: f64,
        th: &Thresholds,
    ) -> Result<f64, EngineError> {
        if known_weight_g == 0.0 || !known_weight_g.is_finite() {
            return Err(EngineError::InvalidCalibration(format!(
                "known weight must be a non-zero number, got {known_weight_g}"
            )));
        }
        match *self {
            Self::FromRaw { raw, offset } => {
                if raw == 0.0 {
                    return Err(EngineError::InvalidCalibration(format!(
                        "raw reading on {channel} is zero"
                    )));
                }
                let factor = (raw - offset) / known_weight_g;
                if !factor.is_finite() || factor.abs() < th.min_factor || factor.abs() > th.max_factor
                {
                    return Err(EngineError::InvalidCalibration(format!(
                        "factor {factor} outside [{}, {}]",
                        th.min_factor, th.max_factor
                    )));
                }
                Ok(factor)
            }
            Self::FromReported { current_weight } => {
                if current_weight == 0.0 {
                    return Err(EngineError::NoReference(channel));
                }
                Ok(current_weight / known_weight_g)
            }
        }
    }
}

/// Factor that makes the current raw sample read `target_weight_g`.
///
/// Unlike `calibrate` this skips the bounds check; it exists to recover a
/// channel whose factor was set from a bad reference.
pub fn fix_factor(raw: f64, offset: f64, target_weight_g: f64) -> Result<f64, EngineError> {
    let adjusted = raw - offset;
    if adjusted == 0.0 {
        return Err(EngineError::InvalidCalibration(
            "offset-adjusted raw value is zero".into(),
        ));
    }
    if target_weight_g == 0.0 || !target_weight_g.is_finite() {
        return Err(EngineError::InvalidCalibration(format!(
            "target weight must be a non-zero number, got {target_weight_g}"
        )));
    }
    Ok(adjusted / target_weight_g)
}
