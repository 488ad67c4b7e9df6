//! Running statistics.
//!
//! Counters and the incremental mean live in the shared store under fixed
//! keys so every process sees the same numbers. Updates are independent
//! store calls with no lock around the mean's read-modify-write; two
//! completions racing can lose a little precision, but counters only ever
//! go up.

use std::sync::Arc;
use std::time::Duration;

use modgate_storage::{KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Completed (non-cached) classifications.
pub const TOTAL_REQUESTS_KEY: &str = "total_requests";
/// Submissions answered from the cache.
pub const CACHED_REQUESTS_KEY: &str = "cached_requests";
/// Mean classification latency in seconds.
pub const AVERAGE_RESPONSE_TIME_KEY: &str = "average_response_time";
/// Accepted submissions.
pub const MODERATION_REQUESTS_KEY: &str = "moderation_requests";

/// Snapshot of the running statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    /// Accepted submissions.
    pub total_requests: i64,
    /// Cache hits.
    pub cached_requests: i64,
    /// Mean latency of completed classifications, in seconds.
    pub average_response_time: f64,
    /// Completed classifications (the mean's sample count).
    pub completed_requests: i64,
}

/// Maintains the shared counters.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn KeyValueStore>,
}

impl StatsAggregator {
    /// Creates an aggregator over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Counts an accepted submission.
    pub fn record_submission(&self) -> Result<i64> {
        Ok(self.store.incr(MODERATION_REQUESTS_KEY)?)
    }

    /// Counts a cache hit.
    pub fn record_hit(&self) -> Result<i64> {
        Ok(self.store.incr(CACHED_REQUESTS_KEY)?)
    }

    /// Folds one classification latency into the mean and counts it.
    ///
    /// Returns the new mean.
    pub fn record_completion(&self, processing_time: Duration) -> Result<f64> {
        let old_avg = self.read_f64(AVERAGE_RESPONSE_TIME_KEY)?;
        let old_total = self.read_i64(TOTAL_REQUESTS_KEY)?;

        let new_avg = incremental_mean(old_avg, old_total, processing_time.as_secs_f64());

        self.store
            .set(AVERAGE_RESPONSE_TIME_KEY, &new_avg.to_string())?;
        self.store.incr(TOTAL_REQUESTS_KEY)?;

        Ok(new_avg)
    }

    /// Reads the current statistics.
    pub fn snapshot(&self) -> Result<RunningStats> {
        Ok(RunningStats {
            total_requests: self.read_i64(MODERATION_REQUESTS_KEY)?,
            cached_requests: self.read_i64(CACHED_REQUESTS_KEY)?,
            average_response_time: self.read_f64(AVERAGE_RESPONSE_TIME_KEY)?,
            completed_requests: self.read_i64(TOTAL_REQUESTS_KEY)?,
        })
    }

    fn read_i64(&self, key: &str) -> Result<i64> {
        match self.store.get(key)? {
            Some(raw) => raw.parse().map_err(|_| corrupt(key, raw)),
            None => Ok(0),
        }
    }

    fn read_f64(&self, key: &str) -> Result<f64> {
        match self.store.get(key)? {
            Some(raw) => raw.parse().map_err(|_| corrupt(key, raw)),
            None => Ok(0.0),
        }
    }
}

/// `(old_avg * old_total + sample) / (old_total + 1)`.
pub fn incremental_mean(old_avg: f64, old_total: i64, sample: f64) -> f64 {
    let n = old_total.max(0) as f64;
    (old_avg * n + sample) / (n + 1.0)
}

fn corrupt(key: &str, value: String) -> crate::error::WorkerError {
    StorageError::CorruptValue {
        key: key.to_string(),
        value,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate_storage::SharedStore;

    fn aggregator() -> (StatsAggregator, Arc<SharedStore>) {
        let store = Arc::new(SharedStore::in_memory().unwrap());
        (StatsAggregator::new(store.clone()), store)
    }

    #[test]
    fn test_starts_at_zero() {
        let (stats, _) = aggregator();
        assert_eq!(stats.snapshot().unwrap(), RunningStats::default());
    }

    #[test]
    fn test_record_hit() {
        let (stats, _) = aggregator();

        stats.record_hit().unwrap();
        stats.record_hit().unwrap();

        let snap = stats.snapshot().unwrap();
        assert_eq!(snap.cached_requests, 2);
        assert_eq!(snap.completed_requests, 0);
    }

    #[test]
    fn test_sequential_mean_is_arithmetic_mean() {
        let (stats, _) = aggregator();
        let samples = [0.5, 1.5, 0.25, 2.0, 0.75];

        for s in samples {
            stats.record_completion(Duration::from_secs_f64(s)).unwrap();
        }

        let expected = samples.iter().sum::<f64>() / samples.len() as f64;
        let snap = stats.snapshot().unwrap();
        assert!((snap.average_response_time - expected).abs() < 1e-9);
        assert_eq!(snap.completed_requests, samples.len() as i64);
    }

    #[test]
    fn test_submission_counter_is_separate() {
        let (stats, _) = aggregator();

        stats.record_submission().unwrap();
        stats.record_submission().unwrap();
        stats.record_completion(Duration::from_millis(100)).unwrap();

        let snap = stats.snapshot().unwrap();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.completed_requests, 1);
    }

    #[test]
    fn test_corrupt_value_is_error() {
        let (stats, store) = aggregator();
        store.set(AVERAGE_RESPONSE_TIME_KEY, "fast").unwrap();

        assert!(stats.snapshot().is_err());
        assert!(stats.record_completion(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_incremental_mean() {
        assert_eq!(incremental_mean(0.0, 0, 2.0), 2.0);
        assert_eq!(incremental_mean(2.0, 1, 4.0), 3.0);
        assert_eq!(incremental_mean(3.0, 2, 0.0), 2.0);
    }
}
