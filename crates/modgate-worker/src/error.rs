//! Worker error types.

use thiserror::Error;

/// Errors raised inside the task path.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Storage or shared store failure.
    #[error("storage error: {0}")]
    Storage(#[from] modgate_storage::StorageError),

    /// The classification call failed.
    #[error("{0}")]
    Classification(#[from] modgate_core::ClassificationError),

    /// A payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Metric registration failed.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
