//! Database schema and migrations.
//!
//! Two databases are managed here. The records database holds the
//! moderation results table. The shared store holds everything the API and
//! the workers coordinate through: key-value entries (cache and counters),
//! the task queue with its results, and worker heartbeats.
//!
//! Versions are tracked per schema, so both can live in one file.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::error::Result;

/// Current records schema version.
pub const RECORDS_SCHEMA_VERSION: i32 = 1;

/// Current shared store schema version.
pub const SHARED_SCHEMA_VERSION: i32 = 1;

/// Which database a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Persisted moderation records.
    Records,
    /// Cache, counters, task queue, and worker heartbeats.
    Shared,
}

impl Schema {
    /// Name under which this schema's version is recorded.
    pub fn name(self) -> &'static str {
        match self {
            Schema::Records => "records",
            Schema::Shared => "shared",
        }
    }

    /// Latest version for this schema.
    pub fn version(self) -> i32 {
        match self {
            Schema::Records => RECORDS_SCHEMA_VERSION,
            Schema::Shared => SHARED_SCHEMA_VERSION,
        }
    }

    /// Run all pending migrations.
    pub fn migrate(self, conn: &Connection) -> Result<()> {
        let current_version = get_schema_version(conn, self)?;
        let target = self.version();

        if current_version < target {
            info!(
                schema = ?self,
                "Running migrations from version {} to {}", current_version, target
            );

            match self {
                Schema::Records => {
                    if current_version < 1 {
                        migrate_records_v1(conn)?;
                    }
                }
                Schema::Shared => {
                    if current_version < 1 {
                        migrate_shared_v1(conn)?;
                    }
                }
            }

            set_schema_version(conn, self, target)?;
            info!("Migrations complete");
        }

        Ok(())
    }
}

/// Get the current version of one schema.
fn get_schema_version(conn: &Connection, schema: Schema) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row(
            "SELECT version FROM schema_version WHERE name = ?1",
            [schema.name()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Set the version of one schema.
fn set_schema_version(conn: &Connection, schema: Schema, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (name, version) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET version = excluded.version",
        params![schema.name(), version],
    )?;
    Ok(())
}

/// Records v1: moderation results keyed by unique kind and text.
fn migrate_records_v1(conn: &Connection) -> Result<()> {
    info!("Applying records migration v1: moderation results");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS moderation_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL DEFAULT 'text',
            text TEXT NOT NULL,
            result TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (kind, text)
        )",
        [],
    )?;

    Ok(())
}

/// Shared v1: key-value entries, the task queue, and worker heartbeats.
fn migrate_shared_v1(conn: &Connection) -> Result<()> {
    info!("Applying shared migration v1: key-value entries, tasks and workers");

    // expires_at is unix millis; NULL never expires
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            result TEXT,
            error TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            worker_id TEXT,
            claimed_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status, seq)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS workers (
            id TEXT PRIMARY KEY,
            started_at INTEGER NOT NULL,
            last_seen INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}
