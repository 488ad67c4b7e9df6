//! Result cache.
//!
//! Classification results stored as JSON under their cache key, expiring
//! after a fixed TTL. Nothing is evicted early.

use std::sync::Arc;
use std::time::Duration;

use modgate_storage::KeyValueStore;
use serde_json::Value;

use crate::error::Result;

/// Default time-to-live for cached results (one hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Time-bounded key to result store.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ResultCache {
    /// Creates a cache with the default TTL.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Creates a cache with a custom TTL.
    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns the TTL applied on every put.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up a cached result.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Stores a result, replacing any previous entry and restarting its TTL.
    pub fn put(&self, key: &str, result: &Value) -> Result<()> {
        let raw = serde_json::to_string(result)?;
        self.store.set_ex(key, &raw, self.ttl)?;
        Ok(())
    }
}
