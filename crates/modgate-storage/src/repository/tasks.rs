//! Task queue repository.
//!
//! Tasks move `queued -> running -> completed | failed`. A claim is a single
//! UPDATE so two workers never run the same delivery. Running tasks whose
//! claim outlives the visibility timeout go back to `queued`, which gives
//! at-least-once delivery when a worker dies mid-task.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{from_millis, TaskRecord, TaskStatus};

const TASK_COLUMNS: &str =
    "id, payload, status, result, error, attempts, worker_id, created_at, updated_at";

/// Repository for task queue operations.
pub struct TasksRepo;

impl TasksRepo {
    /// Enqueue a task.
    pub fn insert(conn: &Connection, id: &str, payload: &str, now_ms: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO tasks (id, payload, status, created_at, updated_at)
             VALUES (?1, ?2, 'queued', ?3, ?3)",
            params![id, payload, now_ms],
        )?;
        Ok(())
    }

    /// Claim the oldest queued task for a worker.
    pub fn claim_next(conn: &Connection, worker_id: &str, now_ms: i64) -> Result<Option<TaskRecord>> {
        let sql = format!(
            "UPDATE tasks
             SET status = 'running', worker_id = ?1, attempts = attempts + 1,
                 claimed_at = ?2, updated_at = ?2
             WHERE seq = (SELECT seq FROM tasks WHERE status = 'queued' ORDER BY seq LIMIT 1)
             RETURNING {}",
            TASK_COLUMNS
        );

        let task = conn
            .query_row(&sql, params![worker_id, now_ms], map_task)
            .optional()?;

        Ok(task)
    }

    /// Mark a task completed with its result payload.
    pub fn complete(conn: &Connection, id: &str, result: &str, now_ms: i64) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE tasks SET status = 'completed', result = ?2, error = NULL, updated_at = ?3
             WHERE id = ?1",
            params![id, result, now_ms],
        )?;
        Ok(updated > 0)
    }

    /// Mark a task failed.
    pub fn fail(conn: &Connection, id: &str, error: &str, now_ms: i64) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE tasks SET status = 'failed', error = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, error, now_ms],
        )?;
        Ok(updated > 0)
    }

    /// Get a task by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<TaskRecord>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        let task = conn.query_row(&sql, [id], map_task).optional()?;
        Ok(task)
    }

    /// Return running tasks claimed before the cutoff to the queue.
    pub fn requeue_stale(conn: &Connection, claimed_before_ms: i64, now_ms: i64) -> Result<usize> {
        let requeued = conn.execute(
            "UPDATE tasks SET status = 'queued', worker_id = NULL, claimed_at = NULL, updated_at = ?2
             WHERE status = 'running' AND claimed_at < ?1",
            params![claimed_before_ms, now_ms],
        )?;
        Ok(requeued)
    }

    /// Count tasks in a given state.
    pub fn count_by_status(conn: &Connection, status: TaskStatus) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        payload: row.get(1)?,
        status: row
            .get::<_, String>(2)
            .ok()
            .and_then(|s| TaskStatus::parse(&s))
            .unwrap_or(TaskStatus::Queued),
        result: row.get(3)?,
        error: row.get(4)?,
        attempts: row.get(5)?,
        worker_id: row.get(6)?,
        created_at: from_millis(row.get(7)?),
        updated_at: from_millis(row.get(8)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        Schema::Shared.migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();

        TasksRepo::insert(&conn, "t1", r#"{"text":"hi"}"#, 1_000).unwrap();
        let task = TasksRepo::get(&conn, "t1").unwrap().unwrap();

        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.payload, r#"{"text":"hi"}"#);
        assert_eq!(task.attempts, 0);
        assert!(task.result.is_none());
    }

    #[test]
    fn test_claim_is_fifo() {
        let conn = setup_db();

        TasksRepo::insert(&conn, "first", "{}", 1).unwrap();
        TasksRepo::insert(&conn, "second", "{}", 2).unwrap();

        let a = TasksRepo::claim_next(&conn, "w1", 10).unwrap().unwrap();
        let b = TasksRepo::claim_next(&conn, "w2", 11).unwrap().unwrap();

        assert_eq!(a.id, "first");
        assert_eq!(a.status, TaskStatus::Running);
        assert_eq!(a.worker_id.as_deref(), Some("w1"));
        assert_eq!(a.attempts, 1);
        assert_eq!(b.id, "second");
        assert!(TasksRepo::claim_next(&conn, "w3", 12).unwrap().is_none());
    }

    #[test]
    fn test_complete_and_fail() {
        let conn = setup_db();

        TasksRepo::insert(&conn, "ok", "{}", 1).unwrap();
        TasksRepo::insert(&conn, "bad", "{}", 1).unwrap();

        assert!(TasksRepo::complete(&conn, "ok", r#"{"flagged":false}"#, 5).unwrap());
        assert!(TasksRepo::fail(&conn, "bad", "worker panicked", 5).unwrap());
        assert!(!TasksRepo::complete(&conn, "missing", "{}", 5).unwrap());

        let ok = TasksRepo::get(&conn, "ok").unwrap().unwrap();
        assert_eq!(ok.status, TaskStatus::Completed);
        assert_eq!(ok.result.as_deref(), Some(r#"{"flagged":false}"#));

        let bad = TasksRepo::get(&conn, "bad").unwrap().unwrap();
        assert_eq!(bad.status, TaskStatus::Failed);
        assert_eq!(bad.error.as_deref(), Some("worker panicked"));
    }

    #[test]
    fn test_requeue_stale_redelivers() {
        let conn = setup_db();

        TasksRepo::insert(&conn, "t", "{}", 0).unwrap();
        TasksRepo::claim_next(&conn, "dead-worker", 100).unwrap().unwrap();

        // Claim is fresh, nothing moves
        assert_eq!(TasksRepo::requeue_stale(&conn, 50, 150).unwrap(), 0);

        assert_eq!(TasksRepo::requeue_stale(&conn, 200, 250).unwrap(), 1);
        let again = TasksRepo::claim_next(&conn, "live-worker", 300).unwrap().unwrap();
        assert_eq!(again.id, "t");
        assert_eq!(again.attempts, 2);
        assert_eq!(again.worker_id.as_deref(), Some("live-worker"));
    }

    #[test]
    fn test_requeue_ignores_terminal() {
        let conn = setup_db();

        TasksRepo::insert(&conn, "t", "{}", 0).unwrap();
        TasksRepo::claim_next(&conn, "w", 10).unwrap();
        TasksRepo::complete(&conn, "t", "{}", 20).unwrap();

        assert_eq!(TasksRepo::requeue_stale(&conn, 1_000, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_count_by_status() {
        let conn = setup_db();

        TasksRepo::insert(&conn, "a", "{}", 0).unwrap();
        TasksRepo::insert(&conn, "b", "{}", 0).unwrap();
        TasksRepo::claim_next(&conn, "w", 1).unwrap();

        assert_eq!(TasksRepo::count_by_status(&conn, TaskStatus::Queued).unwrap(), 1);
        assert_eq!(TasksRepo::count_by_status(&conn, TaskStatus::Running).unwrap(), 1);
    }
}
