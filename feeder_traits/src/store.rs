use chrono::{DateTime, Utc};

use crate::channel::Channel;

/// Error type crossing the persistence boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One accepted reading as recorded in the global history.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub channel: Channel,
    /// Calibrated weight that was made visible for this sample (grams).
    pub weight_g: f64,
    /// Raw sample as received, if the remote unit sent one.
    pub raw: Option<f64>,
}

/// Durable storage for per-channel calibration and the reading history.
///
/// Implementations are shared across threads and called from inside the
/// engine's per-channel critical section, so every method takes `&self`.
/// All methods are fallible; the engine treats failures as soft.
pub trait CalibrationStore: Send + Sync {
    fn load_calibration(&self, channel: Channel) -> Result<Option<f64>, BoxError>;
    fn save_calibration(&self, channel: Channel, factor: f64) -> Result<(), BoxError>;

    fn load_offset(&self, channel: Channel) -> Result<Option<f64>, BoxError>;
    fn save_offset(&self, channel: Channel, offset: f64) -> Result<(), BoxError>;
    fn delete_offset(&self, channel: Channel) -> Result<(), BoxError>;

    /// Last raw sample seen for the channel, kept so calibration works after a restart.
    fn load_last_raw(&self, channel: Channel) -> Result<Option<f64>, BoxError>;
    fn save_last_raw(&self, channel: Channel, raw: f64) -> Result<(), BoxError>;

    fn append_history(&self, reading: &Reading) -> Result<(), BoxError>;
    /// Most recent `limit` readings, oldest first.
    fn load_recent_history(&self, limit: usize) -> Result<Vec<Reading>, BoxError>;
}

impl<T: CalibrationStore + ?Sized> CalibrationStore for std::sync::Arc<T> {
    fn load_calibration(&self, channel: Channel) -> Result<Option<f64>, BoxError> {
        (**self).load_calibration(channel)
    }
    fn save_calibration(&self, channel: Channel, factor: f64) -> Result<(), BoxError> {
        (**self).save_calibration(channel, factor)
    }
    fn load_offset(&self, channel: Channel) -> Result<Option<f64>, BoxError> {
        (**self).load_offset(channel)
    }
    fn save_offset(&self, channel: Channel, offset: f64) -> Result<(), BoxError> {
        (**self).save_offset(channel, offset)
    }
    fn delete_offset(&self, channel: Channel) -> Result<(), BoxError> {
        (**self).delete_offset(channel)
    }
    fn load_last_raw(&self, channel: Channel) -> Result<Option<f64>, BoxError> {
        (**self).load_last_raw(channel)
    }
    fn save_last_raw(&self, channel: Channel, raw: f64) -> Result<(), BoxError> {
        (**self).save_last_raw(channel, raw)
    }
    fn append_history(&self, reading: &Reading) -> Result<(), BoxError> {
        (**self).append_history(reading)
    }
    fn load_recent_history(&self, limit: usize) -> Result<Vec<Reading>, BoxError> {
        (**self).load_recent_history(limit)
    }
}
