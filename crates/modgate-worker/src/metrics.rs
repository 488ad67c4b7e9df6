//! Prometheus metrics.
//!
//! Each [`Metrics`] value owns its registry, so tests and multiple servers
//! in one process do not collide on metric names.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

use crate::error::Result;

/// Latency buckets for classification calls (seconds).
const MODERATION_LATENCY_BUCKETS: &[f64] = &[
    0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Content type of the text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Service metrics.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Health endpoint hits.
    pub health_check_requests: IntCounter,
    /// Readiness checks that reported unhealthy.
    pub health_check_failures: IntCounter,
    /// Accepted submissions.
    pub moderation_requests: IntCounter,
    /// Tasks that finished with an error payload.
    pub moderation_failures: IntCounter,
    /// Classification latency on cache misses.
    pub moderation_latency: Histogram,
    /// Submissions answered from the cache.
    pub cached_requests: IntCounter,
}

impl Metrics {
    /// Create and register all metrics on a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let health_check_requests =
            IntCounter::new("health_check_requests", "Number of health check requests")?;
        let health_check_failures =
            IntCounter::new("health_check_failures", "Number of failed health checks")?;
        let moderation_requests =
            IntCounter::new("moderation_requests", "Number of moderation requests")?;
        let moderation_failures = IntCounter::new(
            "moderation_failures",
            "Number of failed moderation requests",
        )?;
        let moderation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "moderation_latency_seconds",
                "Time spent processing moderation requests",
            )
            .buckets(MODERATION_LATENCY_BUCKETS.to_vec()),
        )?;
        let cached_requests =
            IntCounter::new("cached_requests", "Number of cached moderation requests")?;

        registry.register(Box::new(health_check_requests.clone()))?;
        registry.register(Box::new(health_check_failures.clone()))?;
        registry.register(Box::new(moderation_requests.clone()))?;
        registry.register(Box::new(moderation_failures.clone()))?;
        registry.register(Box::new(moderation_latency.clone()))?;
        registry.register(Box::new(cached_requests.clone()))?;

        Ok(Self {
            registry,
            health_check_requests,
            health_check_failures,
            moderation_requests,
            moderation_failures,
            moderation_latency,
            cached_requests,
        })
    }

    /// Encode every metric in the text exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_all_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.moderation_requests.inc();
        metrics.moderation_latency.observe(0.2);

        let text = metrics.render().unwrap();
        assert!(text.contains("health_check_requests 0"));
        assert!(text.contains("moderation_requests 1"));
        assert!(text.contains("moderation_latency_seconds_count 1"));
        assert!(text.contains("cached_requests 0"));
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();

        a.cached_requests.inc();
        assert_eq!(a.cached_requests.get(), 1);
        assert_eq!(b.cached_requests.get(), 0);
    }

    #[test]
    fn test_clone_shares_counters() {
        let metrics = Metrics::new().unwrap();
        let clone = metrics.clone();

        clone.moderation_failures.inc();
        assert_eq!(metrics.moderation_failures.get(), 1);
    }
}
