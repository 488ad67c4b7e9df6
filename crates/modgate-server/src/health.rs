//! Readiness checks.
//!
//! Four probes run concurrently. Blocking probes go through
//! `spawn_blocking` under a timeout, so a hung or panicking probe marks only
//! its own component unhealthy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use modgate_core::credential_configured;
use modgate_storage::{KeyValueStore, Ping};
use modgate_worker::{TaskBroker, DEFAULT_LIVENESS_WINDOW};
use tracing::{debug, warn};

use crate::models::{ComponentHealth, HealthState, ReadinessResponse};

/// Default upper bound for a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reduces dependency probes to one readiness report.
#[derive(Clone)]
pub struct HealthAggregator {
    db: Arc<dyn Ping>,
    store: Arc<dyn KeyValueStore>,
    broker: Arc<dyn TaskBroker>,
    api_key: Option<String>,
    probe_timeout: Duration,
    liveness_window: Duration,
}

impl HealthAggregator {
    /// Creates an aggregator over the given dependencies.
    pub fn new(
        db: Arc<dyn Ping>,
        store: Arc<dyn KeyValueStore>,
        broker: Arc<dyn TaskBroker>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            db,
            store,
            broker,
            api_key,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            liveness_window: DEFAULT_LIVENESS_WINDOW,
        }
    }

    /// Sets the per-probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets how recent a worker heartbeat must be.
    pub fn with_liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window = window;
        self
    }

    /// Runs every probe and reduces them.
    pub async fn check(&self) -> ReadinessResponse {
        let (database, redis, celery, api) = tokio::join!(
            self.check_database(),
            self.check_store(),
            self.check_workers(),
            self.check_credential(),
        );

        let healthy = [&database, &redis, &celery, &api]
            .iter()
            .all(|c| c.is_healthy());

        let status = if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };

        debug!(?status, "Readiness check complete");

        ReadinessResponse {
            status,
            database,
            redis,
            celery,
            api,
            last_checked: Utc::now(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let db = self.db.clone();
        self.probe("database", move || match db.ping() {
            Ok(()) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        })
        .await
    }

    async fn check_store(&self) -> ComponentHealth {
        let store = self.store.clone();
        self.probe("redis", move || match store.ping() {
            Ok(()) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        })
        .await
    }

    async fn check_workers(&self) -> ComponentHealth {
        let broker = self.broker.clone();
        let window = self.liveness_window;
        self.probe("celery", move || match broker.active_workers(window) {
            Ok(0) => ComponentHealth::unhealthy("No active workers"),
            Ok(_) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(e.to_string()),
        })
        .await
    }

    async fn check_credential(&self) -> ComponentHealth {
        if credential_configured(self.api_key.as_deref()) {
            ComponentHealth::healthy()
        } else {
            ComponentHealth::unhealthy("OpenAI API key not configured")
        }
    }

    async fn probe<F>(&self, component: &'static str, f: F) -> ComponentHealth
    where
        F: FnOnce() -> ComponentHealth + Send + 'static,
    {
        let health = match tokio::time::timeout(self.probe_timeout, tokio::task::spawn_blocking(f))
            .await
        {
            Ok(Ok(health)) => health,
            Ok(Err(e)) => ComponentHealth::unhealthy(format!("probe failed: {}", e)),
            Err(_) => ComponentHealth::unhealthy(format!(
                "probe timed out after {}ms",
                self.probe_timeout.as_millis()
            )),
        };

        if !health.is_healthy() {
            warn!(
                component,
                details = health.details.as_deref().unwrap_or_default(),
                "Health probe failed"
            );
        }

        health
    }
}
