//! Task executor.
//!
//! Runs one submission: cache lookup, then on a miss the classification
//! call, statistics, cache population and persistence. Every failure ends
//! as an [`Outcome`]; nothing here panics or propagates out to the worker
//! loop.
//!
//! The cache and statistics live in the shared store. When that store is
//! unreachable the executor logs a warning and carries on as if the cache
//! had missed: classification and persistence still happen.

use std::sync::Arc;
use std::time::Instant;

use modgate_core::{ClassificationGateway, Content, SubmissionKey};
use modgate_storage::{Database, RecordKind};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::cache::ResultCache;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::stats::StatsAggregator;

/// Everything a task needs, handed in explicitly.
#[derive(Clone)]
pub struct TaskContext {
    /// Result cache.
    pub cache: ResultCache,
    /// Shared counters.
    pub stats: StatsAggregator,
    /// Process metrics.
    pub metrics: Metrics,
    /// Records database.
    pub db: Database,
    /// Classification gateway.
    pub gateway: ClassificationGateway,
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Served from the cache; no classification call was made.
    CacheHit(Value),
    /// Classified, cached and persisted.
    Classified(Value),
    /// Classification or persistence failed.
    Failed(String),
}

impl Outcome {
    /// The payload stored as the task result.
    ///
    /// Failures become `{"error": message}` so the task still completes.
    pub fn into_payload(self) -> Value {
        match self {
            Outcome::CacheHit(v) | Outcome::Classified(v) => v,
            Outcome::Failed(message) => json!({ "error": message }),
        }
    }

    /// Returns true for a cache hit.
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Outcome::CacheHit(_))
    }
}

/// Executes moderation tasks against an injected context.
#[derive(Clone)]
pub struct TaskExecutor {
    ctx: Arc<TaskContext>,
}

impl TaskExecutor {
    /// Creates an executor.
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Returns the context.
    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Runs one submission to an outcome.
    pub async fn execute(&self, content: &Content) -> Outcome {
        let submission = content.key();
        let key = submission.cache_key();

        match self.ctx.cache.get(&key) {
            Ok(Some(cached)) => {
                info!(key_len = key.len(), "Cache hit");
                self.ctx.metrics.cached_requests.inc();
                if let Err(e) = self.ctx.stats.record_hit() {
                    warn!("Failed to record cache hit: {}", e);
                }
                return Outcome::CacheHit(cached);
            }
            Ok(None) => debug!(key_len = key.len(), "Cache miss"),
            Err(e) => warn!("Cache lookup failed, treating as miss: {}", e),
        }

        let start = Instant::now();
        match self.classify_and_store(content, &submission, &key, start).await {
            Ok(result) => Outcome::Classified(result),
            Err(e) => {
                error!("Error moderating content: {}", e);
                self.ctx.metrics.moderation_failures.inc();
                Outcome::Failed(e.to_string())
            }
        }
    }

    async fn classify_and_store(
        &self,
        content: &Content,
        submission: &SubmissionKey<'_>,
        key: &str,
        start: Instant,
    ) -> Result<Value> {
        let result = self.ctx.gateway.classify(content).await?;

        let elapsed = start.elapsed();
        self.ctx.metrics.moderation_latency.observe(elapsed.as_secs_f64());
        match self.ctx.stats.record_completion(elapsed) {
            Ok(avg) => debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                average_secs = avg,
                "Recorded completion"
            ),
            Err(e) => warn!("Failed to update running statistics: {}", e),
        }

        if let Err(e) = self.ctx.cache.put(key, &result) {
            warn!("Failed to cache moderation result: {}", e);
        }

        let kind = if submission.is_batch() {
            RecordKind::Batch
        } else {
            RecordKind::Text
        };
        if !self.ctx.db.save_record(kind, submission.as_str(), &result)? {
            debug!("Record for this submission already stored, keeping the first");
        }

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Moderation complete"
        );

        Ok(result)
    }
}
