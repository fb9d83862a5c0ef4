//! Maps `Box<dyn Error>` from the storage trait boundary to `EngineError`.
//!
//! `feeder_traits::CalibrationStore` returns boxed errors so any backend can
//! plug in; this converts them to the typed `Persistence` variant, with an
//! optional feature-gated path for `feeder_store::StoreError` downcasting.

use crate::error::EngineError;

/// Map a store error to `EngineError::Persistence`.
///
/// Known store errors get a stable, kind-prefixed message.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> EngineError {
    #[cfg(feature = "store-errors")]
    {
        use feeder_store::StoreError;
        if let Some(se) = e.downcast_ref::<StoreError>() {
            let kind = match se {
                StoreError::Io(_) => "io",
                StoreError::Csv(_) => "csv",
                StoreError::Decode { .. } => "decode",
                StoreError::Encode { .. } => "encode",
                StoreError::Poisoned => "lock",
                StoreError::Injected => "injected",
            };
            return EngineError::Persistence(format!("{kind}: {se}"));
        }
    }

    EngineError::Persistence(e.to_string())
}
