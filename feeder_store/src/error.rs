use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("decode {file}: {reason}")]
    Decode { file: &'static str, reason: String },
    #[error("encode {file}: {reason}")]
    Encode { file: &'static str, reason: String },
    #[error("store lock poisoned")]
    Poisoned,
    #[error("write rejected (failure injection)")]
    Injected,
}

pub type Result<T> = std::result::Result<T, StoreError>;
