//! Shared store.
//!
//! One SQLite file that the API process and every worker process open. It
//! serves three roles: the result cache and running counters (through the
//! [`KeyValueStore`] trait), the task queue with its result store, and the
//! worker heartbeat table.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::database::data_dir;
use crate::error::Result;
use crate::models::{TaskRecord, TaskStatus};
use crate::pool::ConnectionPool;
use crate::repository::{KvRepo, TasksRepo, WorkersRepo};
use crate::schema::Schema;

/// Minimal key-value contract used by the cache and the statistics.
///
/// Every call is independent; there are no multi-key transactions.
pub trait KeyValueStore: Send + Sync {
    /// Get a live value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value with no expiry.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set a value that expires after `ttl`.
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Increment an integer counter and return the new value.
    fn incr(&self, key: &str) -> Result<i64>;

    /// Check that the store answers.
    fn ping(&self) -> Result<()>;
}

/// SQLite-backed shared store.
#[derive(Clone)]
pub struct SharedStore {
    pool: ConnectionPool,
}

impl SharedStore {
    /// Open the store in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_store_path()?)
    }

    /// Open the store at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening shared store at: {:?}", path);
        let pool = ConnectionPool::new(&path, Schema::Shared)?;

        Ok(Self { pool })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory(Schema::Shared)?;
        Ok(Self { pool })
    }

    /// Get the default store path.
    pub fn default_store_path() -> Result<PathBuf> {
        Ok(data_dir()?.join("modgate-store.db"))
    }

    /// Remove expired key-value entries.
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        KvRepo::purge_expired(&conn, now_ms())
    }

    // === Tasks ===

    /// Enqueue a task payload under the given id.
    pub fn enqueue_task(&self, id: &str, payload: &str) -> Result<()> {
        let conn = self.pool.get()?;
        TasksRepo::insert(&conn, id, payload, now_ms())
    }

    /// Claim the oldest queued task.
    pub fn claim_task(&self, worker_id: &str) -> Result<Option<TaskRecord>> {
        let conn = self.pool.get()?;
        TasksRepo::claim_next(&conn, worker_id, now_ms())
    }

    /// Store a task's result and mark it completed.
    pub fn complete_task(&self, id: &str, result: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        TasksRepo::complete(&conn, id, result, now_ms())
    }

    /// Mark a task failed.
    pub fn fail_task(&self, id: &str, error: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        TasksRepo::fail(&conn, id, error, now_ms())
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Option<TaskRecord>> {
        let conn = self.pool.get()?;
        TasksRepo::get(&conn, id)
    }

    /// Requeue running tasks whose claim is older than `visibility_timeout`.
    pub fn requeue_stale_tasks(&self, visibility_timeout: Duration) -> Result<usize> {
        let conn = self.pool.get()?;
        let now = now_ms();
        TasksRepo::requeue_stale(&conn, now.saturating_sub(duration_ms(visibility_timeout)), now)
    }

    /// Count tasks in a given state.
    pub fn count_tasks(&self, status: TaskStatus) -> Result<i64> {
        let conn = self.pool.get()?;
        TasksRepo::count_by_status(&conn, status)
    }

    // === Workers ===

    /// Record a worker heartbeat.
    pub fn heartbeat(&self, worker_id: &str) -> Result<()> {
        let conn = self.pool.get()?;
        WorkersRepo::heartbeat(&conn, worker_id, now_ms())
    }

    /// Count workers that sent a heartbeat within `window`.
    pub fn active_workers(&self, window: Duration) -> Result<i64> {
        let conn = self.pool.get()?;
        WorkersRepo::count_active(&conn, now_ms().saturating_sub(duration_ms(window)))
    }

    /// Forget a worker.
    pub fn deregister_worker(&self, worker_id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        WorkersRepo::remove(&conn, worker_id)
    }
}

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        KvRepo::get(&conn, key, now_ms())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.pool.get()?;
        KvRepo::set(&conn, key, value, None)
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let conn = self.pool.get()?;
        KvRepo::set(&conn, key, value, Some(now_ms().saturating_add(duration_ms(ttl))))
    }

    fn incr(&self, key: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        KvRepo::incr_by(&conn, key, 1)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.pool.get()?;
        KvRepo::ping(&conn)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_round_trip() {
        let store = SharedStore::in_memory().unwrap();

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_set_ex_zero_ttl_is_expired() {
        let store = SharedStore::in_memory().unwrap();

        store.set_ex("k", "v", Duration::ZERO).unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn test_set_ex_live() {
        let store = SharedStore::in_memory().unwrap();

        store.set_ex("k", "v", Duration::from_secs(3600)).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_incr() {
        let store = SharedStore::in_memory().unwrap();

        assert_eq!(store.incr("n").unwrap(), 1);
        assert_eq!(store.incr("n").unwrap(), 2);
    }

    #[test]
    fn test_task_lifecycle() {
        let store = SharedStore::in_memory().unwrap();

        store.enqueue_task("t1", "{}").unwrap();
        assert_eq!(store.count_tasks(TaskStatus::Queued).unwrap(), 1);

        let task = store.claim_task("w1").unwrap().unwrap();
        assert_eq!(task.id, "t1");

        store.complete_task("t1", r#"{"ok":true}"#).unwrap();
        let task = store.get_task("t1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_requeue_with_zero_timeout() {
        let store = SharedStore::in_memory().unwrap();

        store.enqueue_task("t1", "{}").unwrap();
        store.claim_task("w1").unwrap().unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(store.requeue_stale_tasks(Duration::ZERO).unwrap(), 1);
        assert_eq!(store.count_tasks(TaskStatus::Queued).unwrap(), 1);
    }

    #[test]
    fn test_worker_heartbeats() {
        let store = SharedStore::in_memory().unwrap();

        assert_eq!(store.active_workers(Duration::from_secs(30)).unwrap(), 0);
        store.heartbeat("w1").unwrap();
        assert_eq!(store.active_workers(Duration::from_secs(30)).unwrap(), 1);

        store.deregister_worker("w1").unwrap();
        assert_eq!(store.active_workers(Duration::from_secs(30)).unwrap(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SharedStore::in_memory().unwrap();
        let other = store.clone();

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));
    }
}
