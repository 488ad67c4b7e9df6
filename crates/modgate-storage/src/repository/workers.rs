//! Worker heartbeat repository.

use rusqlite::{params, Connection};

use crate::error::Result;

/// Repository for worker liveness.
pub struct WorkersRepo;

impl WorkersRepo {
    /// Record that a worker is alive.
    pub fn heartbeat(conn: &Connection, worker_id: &str, now_ms: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO workers (id, started_at, last_seen) VALUES (?1, ?2, ?2)
             ON CONFLICT(id) DO UPDATE SET last_seen = excluded.last_seen",
            params![worker_id, now_ms],
        )?;
        Ok(())
    }

    /// Count workers seen at or after the given time.
    pub fn count_active(conn: &Connection, seen_since_ms: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM workers WHERE last_seen >= ?1",
            [seen_since_ms],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Remove a worker on clean shutdown.
    pub fn remove(conn: &Connection, worker_id: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM workers WHERE id = ?1", [worker_id])?;
        Ok(deleted > 0)
    }
}
