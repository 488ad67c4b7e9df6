//! Application state for the API server.

use std::sync::Arc;

use modgate_storage::{Database, KeyValueStore, SharedStore};
use modgate_worker::{Metrics, StatsAggregator, TaskBroker};

use crate::health::HealthAggregator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Work queue and result store.
    pub broker: Arc<dyn TaskBroker>,
    /// Shared counters.
    pub stats: StatsAggregator,
    /// Process metrics.
    pub metrics: Metrics,
    /// Readiness probes.
    pub health: HealthAggregator,
}

impl AppState {
    /// Creates the state from explicit components.
    pub fn new(
        broker: Arc<dyn TaskBroker>,
        stats: StatsAggregator,
        metrics: Metrics,
        health: HealthAggregator,
    ) -> Self {
        Self {
            broker,
            stats,
            metrics,
            health,
        }
    }

    /// Wires the state over a records database and one shared store.
    pub fn with_stores(
        db: Database,
        store: SharedStore,
        metrics: Metrics,
        api_key: Option<String>,
    ) -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(store.clone());
        let broker: Arc<dyn TaskBroker> = Arc::new(store);

        Self {
            broker: broker.clone(),
            stats: StatsAggregator::new(kv.clone()),
            metrics,
            health: HealthAggregator::new(Arc::new(db), kv, broker, api_key),
        }
    }

    /// Creates application state over in-memory stores.
    ///
    /// Test helper; panics if SQLite cannot open an in-memory database.
    pub fn in_memory() -> Self {
        Self::with_stores(
            Database::in_memory().expect("Failed to create in-memory database"),
            SharedStore::in_memory().expect("Failed to create in-memory store"),
            Metrics::new().expect("Failed to register metrics"),
            None,
        )
    }
}
