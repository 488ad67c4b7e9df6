//! Task dispatch contract.
//!
//! Producers call [`TaskBroker::enqueue`] and get back an opaque
//! [`TaskHandle`]; anyone holding the handle can later ask for the
//! [`TaskState`]. Workers claim deliveries, run them, and record the
//! outcome. [`SharedStore`] implements the contract on SQLite.

use std::time::Duration;

use modgate_core::Content;
use modgate_storage::{SharedStore, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

/// Opaque identifier of an enqueued task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    /// Creates a fresh random handle.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an identifier received from a client.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a result lookup reports.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Waiting for a worker.
    Queued,
    /// A worker is on it.
    Running,
    /// Finished; the payload may itself be error-shaped.
    Completed(Value),
    /// The worker could not produce a payload.
    Failed(String),
}

impl TaskState {
    /// Returns true while the task has not reached a terminal state.
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Queued | TaskState::Running)
    }
}

/// One claimed task.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Task identifier.
    pub handle: TaskHandle,
    /// Submitted content.
    pub content: Content,
    /// Delivery count, starting at 1.
    pub attempt: i64,
}

/// Durable work queue with a result store keyed by task handle.
pub trait TaskBroker: Send + Sync {
    /// Enqueues content and returns its handle.
    fn enqueue(&self, content: &Content) -> Result<TaskHandle>;

    /// Looks up a task. `None` if the handle is unknown.
    fn state(&self, handle: &TaskHandle) -> Result<Option<TaskState>>;

    /// Claims the next queued task for a worker.
    fn claim(&self, worker_id: &str) -> Result<Option<Delivery>>;

    /// Stores the payload of a finished task.
    fn complete(&self, handle: &TaskHandle, result: &Value) -> Result<()>;

    /// Marks a task failed.
    fn fail(&self, handle: &TaskHandle, error: &str) -> Result<()>;

    /// Returns stale running tasks to the queue.
    fn requeue_stale(&self, visibility_timeout: Duration) -> Result<usize>;

    /// Records that a worker is alive.
    fn heartbeat(&self, worker_id: &str) -> Result<()>;

    /// Removes a worker from the liveness table.
    fn deregister(&self, worker_id: &str) -> Result<()>;

    /// Counts workers seen within `window`.
    fn active_workers(&self, window: Duration) -> Result<i64>;
}

impl TaskBroker for SharedStore {
    fn enqueue(&self, content: &Content) -> Result<TaskHandle> {
        let handle = TaskHandle::generate();
        let payload = serde_json::to_string(content)?;
        self.enqueue_task(handle.as_str(), &payload)?;
        Ok(handle)
    }

    fn state(&self, handle: &TaskHandle) -> Result<Option<TaskState>> {
        let Some(task) = self.get_task(handle.as_str())? else {
            return Ok(None);
        };

        let state = match task.status {
            TaskStatus::Queued => TaskState::Queued,
            TaskStatus::Running => TaskState::Running,
            TaskStatus::Completed => {
                let raw = task.result.unwrap_or_else(|| "null".to_string());
                TaskState::Completed(serde_json::from_str(&raw)?)
            }
            TaskStatus::Failed => TaskState::Failed(task.error.unwrap_or_default()),
        };

        Ok(Some(state))
    }

    fn claim(&self, worker_id: &str) -> Result<Option<Delivery>> {
        // Undecodable payloads are failed and skipped so they cannot wedge the queue
        while let Some(task) = self.claim_task(worker_id)? {
            match serde_json::from_str::<Content>(&task.payload) {
                Ok(content) => {
                    return Ok(Some(Delivery {
                        handle: TaskHandle::from_string(task.id),
                        content,
                        attempt: task.attempts,
                    }));
                }
                Err(e) => {
                    warn!(task_id = %task.id, "Dropping undecodable task payload: {}", e);
                    self.fail_task(&task.id, &format!("invalid task payload: {}", e))?;
                }
            }
        }

        Ok(None)
    }

    fn complete(&self, handle: &TaskHandle, result: &Value) -> Result<()> {
        let raw = serde_json::to_string(result)?;
        self.complete_task(handle.as_str(), &raw)?;
        Ok(())
    }

    fn fail(&self, handle: &TaskHandle, error: &str) -> Result<()> {
        self.fail_task(handle.as_str(), error)?;
        Ok(())
    }

    fn requeue_stale(&self, visibility_timeout: Duration) -> Result<usize> {
        Ok(self.requeue_stale_tasks(visibility_timeout)?)
    }

    fn heartbeat(&self, worker_id: &str) -> Result<()> {
        Ok(SharedStore::heartbeat(self, worker_id)?)
    }

    fn deregister(&self, worker_id: &str) -> Result<()> {
        self.deregister_worker(worker_id)?;
        Ok(())
    }

    fn active_workers(&self, window: Duration) -> Result<i64> {
        Ok(SharedStore::active_workers(self, window)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate_core::ContentItem;
    use serde_json::json;

    #[test]
    fn test_enqueue_then_state() {
        let broker = SharedStore::in_memory().unwrap();

        let handle = broker.enqueue(&Content::text("hello")).unwrap();
        assert!(!handle.as_str().is_empty());
        assert_eq!(broker.state(&handle).unwrap(), Some(TaskState::Queued));
    }

    #[test]
    fn test_handles_are_unique() {
        let broker = SharedStore::in_memory().unwrap();

        let a = broker.enqueue(&Content::text("same")).unwrap();
        let b = broker.enqueue(&Content::text("same")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_handle() {
        let broker = SharedStore::in_memory().unwrap();
        let state = broker.state(&TaskHandle::from_string("nope")).unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn test_claim_decodes_content() {
        let broker = SharedStore::in_memory().unwrap();
        let content = Content::Items(vec![
            ContentItem::text("caption"),
            ContentItem::image_url("https://x/a.png"),
        ]);

        let handle = broker.enqueue(&content).unwrap();
        let delivery = broker.claim("w1").unwrap().unwrap();

        assert_eq!(delivery.handle, handle);
        assert_eq!(delivery.content, content);
        assert_eq!(delivery.attempt, 1);
        assert_eq!(broker.state(&handle).unwrap(), Some(TaskState::Running));
    }

    #[test]
    fn test_complete_and_fail() {
        let broker = SharedStore::in_memory().unwrap();

        let ok = broker.enqueue(&Content::text("a")).unwrap();
        let bad = broker.enqueue(&Content::text("b")).unwrap();

        broker.complete(&ok, &json!({"error": "rate limited"})).unwrap();
        broker.fail(&bad, "worker panicked").unwrap();

        assert_eq!(
            broker.state(&ok).unwrap(),
            Some(TaskState::Completed(json!({"error": "rate limited"})))
        );
        assert_eq!(
            broker.state(&bad).unwrap(),
            Some(TaskState::Failed("worker panicked".to_string()))
        );
    }

    #[test]
    fn test_bad_payload_is_skipped() {
        let broker = SharedStore::in_memory().unwrap();

        broker.enqueue_task("broken", "{not json").unwrap();
        let good = broker.enqueue(&Content::text("ok")).unwrap();

        let delivery = broker.claim("w1").unwrap().unwrap();
        assert_eq!(delivery.handle, good);
        assert!(matches!(
            broker.state(&TaskHandle::from_string("broken")).unwrap(),
            Some(TaskState::Failed(_))
        ));
    }

    #[test]
    fn test_pending_states() {
        assert!(TaskState::Queued.is_pending());
        assert!(TaskState::Running.is_pending());
        assert!(!TaskState::Completed(json!({})).is_pending());
        assert!(!TaskState::Failed(String::new()).is_pending());
    }
}
