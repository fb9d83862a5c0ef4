//! Test and helper stores for feeder_core.
use feeder_traits::{BoxError, CalibrationStore, Channel, Reading};

/// A store that remembers nothing; every load is empty and every write succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl CalibrationStore for NullStore {
    fn load_calibration(&self, _: Channel) -> Result<Option<f64>, BoxError> {
        Ok(None)
    }
    fn save_calibration(&self, _: Channel, _: f64) -> Result<(), BoxError> {
        Ok(())
    }
    fn load_offset(&self, _: Channel) -> Result<Option<f64>, BoxError> {
        Ok(None)
    }
    fn save_offset(&self, _: Channel, _: f64) -> Result<(), BoxError> {
        Ok(())
    }
    fn delete_offset(&self, _: Channel) -> Result<(), BoxError> {
        Ok(())
    }
    fn load_last_raw(&self, _: Channel) -> Result<Option<f64>, BoxError> {
        Ok(None)
    }
    fn save_last_raw(&self, _: Channel, _: f64) -> Result<(), BoxError> {
        Ok(())
    }
    fn append_history(&self, _: &Reading) -> Result<(), BoxError> {
        Ok(())
    }
    fn load_recent_history(&self, _: usize) -> Result<Vec<Reading>, BoxError> {
        Ok(Vec::new())
    }
}

/// A store whose every call fails; useful for startup failure paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

fn unavailable<T>() -> Result<T, BoxError> {
    Err(Box::new(std::io::Error::other("store unavailable")))
}

impl CalibrationStore for FailingStore {
    fn load_calibration(&self, _: Channel) -> Result<Option<f64>, BoxError> {
        unavailable()
    }
    fn save_calibration(&self, _: Channel, _: f64) -> Result<(), BoxError> {
        unavailable()
    }
    fn load_offset(&self, _: Channel) -> Result<Option<f64>, BoxError> {
        unavailable()
    }
    fn save_offset(&self, _: Channel, _: f64) -> Result<(), BoxError> {
        unavailable()
    }
    fn delete_offset(&self, _: Channel) -> Result<(), BoxError> {
        unavailable()
    }
    fn load_last_raw(&self, _: Channel) -> Result<Option<f64>, BoxError> {
        unavailable()
    }
    fn save_last_raw(&self, _: Channel, _: f64) -> Result<(), BoxError> {
        unavailable()
    }
    fn append_history(&self, _: &Reading) -> Result<(), BoxError> {
        unavailable()
    }
    fn load_recent_history(&self, _: usize) -> Result<Vec<Reading>, BoxError> {
        unavailable()
    }
}
