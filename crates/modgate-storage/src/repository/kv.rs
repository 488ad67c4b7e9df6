//! Key-value repository.
//!
//! String values with optional expiry, plus integer counters. Expired
//! entries are invisible to reads and are removed by [`KvRepo::purge_expired`].

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StorageError};

/// Repository for key-value operations.
pub struct KvRepo;

impl KvRepo {
    /// Get a live value.
    pub fn get(conn: &Connection, key: &str, now_ms: i64) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now_ms],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    /// Set a value, replacing any previous value and expiry.
    pub fn set(
        conn: &Connection,
        key: &str,
        value: &str,
        expires_at_ms: Option<i64>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expires_at_ms],
        )?;

        Ok(())
    }

    /// Add to an integer counter, creating it at zero, and return the new value.
    pub fn incr_by(conn: &Connection, key: &str, delta: i64) -> Result<i64> {
        let value: String = conn.query_row(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES (?1, CAST(?2 AS TEXT), NULL)
             ON CONFLICT(key) DO UPDATE
                SET value = CAST(CAST(value AS INTEGER) + ?2 AS TEXT), expires_at = NULL
             RETURNING value",
            params![key, delta],
            |row| row.get(0),
        )?;

        value.parse().map_err(|_| StorageError::CorruptValue {
            key: key.to_string(),
            value,
        })
    }

    /// Remove expired entries.
    pub fn purge_expired(conn: &Connection, now_ms: i64) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            [now_ms],
        )?;
        Ok(deleted)
    }

    /// Round-trip query used for reachability checks.
    pub fn ping(conn: &Connection) -> Result<()> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
