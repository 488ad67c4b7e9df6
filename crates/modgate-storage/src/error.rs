//! Storage error types.

use thiserror::Error;

/// Errors raised by the records database and the shared store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored payload was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while preparing the database location.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No platform data directory could be determined.
    #[error("Could not determine app data directory")]
    NoDataDir,

    /// The store cannot be used right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A counter or scalar held something other than a number.
    #[error("Corrupt value for {key}: {value}")]
    CorruptValue { key: String, value: String },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
