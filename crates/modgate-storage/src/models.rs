//! Data models for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key namespace of a persisted record.
///
/// Plain text and multi-item batches are stored side by side; the same
/// string under different kinds names different submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Raw text, or a lone image reference.
    Text,
    /// JSON array of the payloads of a multi-item submission.
    Batch,
}

impl RecordKind {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Text => "text",
            RecordKind::Batch => "batch",
        }
    }

    /// Parse from database string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(RecordKind::Text),
            "batch" => Some(RecordKind::Batch),
            _ => None,
        }
    }
}

/// A persisted moderation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    /// Unique identifier.
    pub id: i64,
    /// Key namespace.
    pub kind: RecordKind,
    /// The submitted text (unique within its kind).
    pub text: String,
    /// Serialized classifier response.
    pub result: String,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// Parameters for persisting a moderation result.
#[derive(Debug, Clone)]
pub struct NewModerationRecord {
    /// Key namespace.
    pub kind: RecordKind,
    /// The submitted text.
    pub text: String,
    /// Serialized classifier response.
    pub result: String,
}

/// Lifecycle state of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a worker.
    Queued,
    /// Claimed by a worker.
    Running,
    /// Finished with a result payload.
    Completed,
    /// Finished without a result.
    Failed,
}

impl TaskStatus {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse from database string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

}

/// A row of the task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Opaque task identifier.
    pub id: String,
    /// Serialized submission.
    pub payload: String,
    /// Current state.
    pub status: TaskStatus,
    /// Serialized result payload, once completed.
    pub result: Option<String>,
    /// Failure message, once failed.
    pub error: Option<String>,
    /// Number of times the task was claimed.
    pub attempts: i64,
    /// Worker holding the claim.
    pub worker_id: Option<String>,
    /// When the task was enqueued.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

/// Converts stored unix millis back to a timestamp.
pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_round_trip() {
        for status in [
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("pending"), None);
    }

    #[test]
    fn test_record_kind_round_trip() {
        for kind in [RecordKind::Text, RecordKind::Batch] {
            assert_eq!(RecordKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RecordKind::parse("image"), None);
    }
}
