use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Document structure error: {0}")]
    Structure(String),

    #[error("Failed to parse '{value}': {reason}")]
    Parse { value: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Failed to open storage at {}: {reason}", path.display())]
    StorageOpen { path: PathBuf, reason: String },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tempfile::PersistError> for EtlError {
    fn from(err: tempfile::PersistError) -> Self {
        EtlError::Io(err.error)
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
