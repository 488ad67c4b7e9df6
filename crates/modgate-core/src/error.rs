//! Core error types.

use thiserror::Error;

/// Errors raised while validating submitted content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    /// Neither text nor an image reference was supplied.
    #[error("either text or image_url must be provided")]
    Empty,

    /// The image reference has an unsupported scheme.
    #[error("invalid image URL format: must start with http://, https://, or data:image/")]
    InvalidImageReference(String),
}

/// Errors raised by the classification provider.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// No credential configured for the provider.
    #[error("moderation API key not configured")]
    MissingCredential,

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("moderation API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider response could not be decoded.
    #[error("failed to decode moderation response: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other provider failure.
    #[error("{0}")]
    Provider(String),
}

/// Result type for classification operations.
pub type Result<T> = std::result::Result<T, ClassificationError>;
