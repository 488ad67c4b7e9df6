//! Modgate Core - content model and classification gateway.
//!
//! This crate holds the pieces of the moderation path that do not touch
//! storage:
//!
//! - [`Content`] and [`ContentItem`], the submitted payloads
//! - [`keying`], which derives cache keys from raw text and item batches
//! - [`ModerationProvider`], the seam to the external classifier
//! - [`ClassificationGateway`], which flattens content into one provider call
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use modgate_core::{ClassificationGateway, Content, OpenAiConfig, OpenAiProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAiProvider::new(OpenAiConfig::new("sk-..."))?;
//! let gateway = ClassificationGateway::new(Arc::new(provider));
//!
//! let verdict = gateway.classify(&Content::text("hello")).await?;
//! println!("{verdict}");
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod error;
pub mod gateway;
pub mod keying;
pub mod provider;

pub use content::{validate_image_reference, Content, ContentItem, IMAGE_REFERENCE_PREFIXES};
pub use error::{ClassificationError, ContentError, Result};
pub use gateway::ClassificationGateway;
pub use keying::{cache_key, SubmissionKey, BATCH_KEY_PREFIX, CACHE_KEY_PREFIX};
pub use provider::{
    credential_configured, ModerationInput, ModerationProvider, OpenAiConfig, OpenAiProvider,
    DEFAULT_MODERATION_MODEL, DEFAULT_OPENAI_BASE_URL, PLACEHOLDER_API_KEY,
};
