//! Background processing for Modgate.
//!
//! Submissions are enqueued on a [`TaskBroker`] and picked up by a
//! [`WorkerPool`]. Each task goes through the [`TaskExecutor`]:
//!
//! 1. Derive the cache key from the submitted content.
//! 2. On a [`ResultCache`] hit, count it and return the cached result.
//! 3. Otherwise classify, fold the latency into the [`StatsAggregator`],
//!    cache the result and persist a record.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use modgate_core::{ClassificationGateway, Content, OpenAiConfig, OpenAiProvider};
//! use modgate_storage::{Database, KeyValueStore, SharedStore};
//! use modgate_worker::{
//!     Metrics, ResultCache, StatsAggregator, TaskBroker, TaskContext, TaskExecutor,
//!     WorkerConfig, WorkerPool,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SharedStore::new()?;
//! let kv: Arc<dyn KeyValueStore> = Arc::new(store.clone());
//! let provider = OpenAiProvider::new(OpenAiConfig::new(std::env::var("OPENAI_API_KEY")?))?;
//!
//! let executor = TaskExecutor::new(TaskContext {
//!     cache: ResultCache::new(kv.clone()),
//!     stats: StatsAggregator::new(kv),
//!     metrics: Metrics::new()?,
//!     db: Database::new()?,
//!     gateway: ClassificationGateway::new(Arc::new(provider)),
//! });
//!
//! let broker: Arc<dyn TaskBroker> = Arc::new(store);
//! let pool = WorkerPool::spawn(WorkerConfig::default(), broker.clone(), executor);
//! let handle = broker.enqueue(&Content::text("hello"))?;
//! # let _ = handle;
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod cache;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod pool;
pub mod stats;

pub use broker::{Delivery, TaskBroker, TaskHandle, TaskState};
pub use cache::{ResultCache, DEFAULT_CACHE_TTL};
pub use error::{Result, WorkerError};
pub use executor::{Outcome, TaskContext, TaskExecutor};
pub use metrics::{Metrics, METRICS_CONTENT_TYPE};
pub use pool::{WorkerConfig, WorkerPool, DEFAULT_LIVENESS_WINDOW};
pub use stats::{incremental_mean, RunningStats, StatsAggregator};
