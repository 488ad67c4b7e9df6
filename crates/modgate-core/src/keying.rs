//! Cache key derivation.
//!
//! Keys are the raw text behind a fixed prefix. Nothing is hashed or
//! normalized, so identical strings collide and strings that differ only in
//! case or whitespace do not.
//!
//! Multi-item submissions live under their own prefix, which no text key
//! can start with.

use std::borrow::Cow;

/// Prefix for moderation result cache keys.
pub const CACHE_KEY_PREFIX: &str = "moderation:";

/// Prefix for cache keys of multi-item submissions.
pub const BATCH_KEY_PREFIX: &str = "moderation-batch:";

/// Builds the cache key for a piece of text.
pub fn cache_key(text: &str) -> String {
    prefixed(CACHE_KEY_PREFIX, text)
}

fn prefixed(prefix: &str, text: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + text.len());
    key.push_str(prefix);
    key.push_str(text);
    key
}

/// What a submission is cached and persisted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionKey<'a> {
    /// Raw text. A lone image item keys by its bare reference.
    Text(Cow<'a, str>),
    /// JSON array of the payloads of a multi-item submission.
    Batch(String),
}

impl SubmissionKey<'_> {
    /// The string persisted alongside the result.
    pub fn as_str(&self) -> &str {
        match self {
            SubmissionKey::Text(text) => text,
            SubmissionKey::Batch(payloads) => payloads,
        }
    }

    /// Returns true for multi-item submissions.
    pub fn is_batch(&self) -> bool {
        matches!(self, SubmissionKey::Batch(_))
    }

    /// The result cache key.
    pub fn cache_key(&self) -> String {
        match self {
            SubmissionKey::Text(text) => cache_key(text),
            SubmissionKey::Batch(payloads) => prefixed(BATCH_KEY_PREFIX, payloads),
        }
    }
}
