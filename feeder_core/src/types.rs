//! Values returned by engine operations.
use feeder_traits::{Channel, Reading};

use crate::config::{FeatureFlags, Thresholds};
use crate::error::EngineError;
use crate::state::ChannelSnapshot;

/// Where the visible weight of an ingest came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightSource {
    /// Produced by the full conditioning pipeline.
    Conditioned,
    /// Channel is uncalibrated; the remote unit's grams were passed through.
    Reported,
    /// Nothing usable arrived; the previous weight was kept.
    Retained,
}

/// Result of one `ingest` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedWeight {
    pub channel: Channel,
    pub weight_g: f64,
    pub source: WeightSource,
    /// New zero offset if this sample triggered an automatic re-zero.
    pub auto_tare_offset: Option<f64>,
    /// First persistence failure hit while recording this sample. The
    /// in-memory update has still been applied.
    pub persist_error: Option<EngineError>,
}

/// One report from the remote unit covering both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    pub weight1_raw: Option<f64>,
    pub weight2_raw: Option<f64>,
    pub weight1_g: Option<f64>,
    pub weight2_g: Option<f64>,
}

impl Frame {
    pub fn raw(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::One => self.weight1_raw,
            Channel::Two => self.weight2_raw,
        }
    }

    pub fn grams(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::One => self.weight1_g,
            Channel::Two => self.weight2_g,
        }
    }
}

/// Pending remote tare flags, as handed to the remote unit on poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TareRequests {
    pub channel1: bool,
    pub channel2: bool,
}

impl TareRequests {
    pub fn get(&self, channel: Channel) -> bool {
        match channel {
            Channel::One => self.channel1,
            Channel::Two => self.channel2,
        }
    }
}

/// Feature flags together with the thresholds they act on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureReport {
    pub flags: FeatureFlags,
    pub thresholds: Thresholds,
}

/// Calibration view of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDiagnostics {
    pub channel: Channel,
    pub raw: Option<f64>,
    pub factor: Option<f64>,
    pub offset: f64,
    /// Offset as currently persisted; `None` when absent or unreadable.
    pub persisted_offset: Option<f64>,
    /// `(raw - offset) / factor`, without smoothing or gating.
    pub calculated_weight_g: Option<f64>,
    /// Factor that would make the current raw read the target weight.
    pub target_factor: Option<f64>,
    pub state: ChannelSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub target_weight_g: f64,
    pub channels: Vec<ChannelDiagnostics>,
    pub recent_readings: Vec<Reading>,
    pub flags: FeatureFlags,
}
