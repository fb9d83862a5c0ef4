//! Shared seams for the feeder workspace.
//!
//! Channel identity, the reading record that flows into history, the
//! monotonic clock and the persistence boundary implemented by storage
//! adapters.
pub mod channel;
pub mod clock;
pub mod store;

pub use channel::Channel;
pub use clock::{Clock, MonotonicClock};
pub use store::{BoxError, CalibrationStore, Reading};
