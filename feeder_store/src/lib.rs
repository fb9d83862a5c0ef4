//! Storage adapters implementing `feeder_traits::CalibrationStore`.
//!
//! - `MemoryStore`: process-local, used by tests, the fuzzer and the
//!   `memory` backend. Writes can be made to fail on demand.
//! - `FileStore`: calibration state in a TOML file and the reading history
//!   in a capped CSV file, both replaced atomically on every change.
pub mod atomic;
pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
