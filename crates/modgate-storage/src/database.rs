//! Records database.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::{ModerationRecord, NewModerationRecord, RecordKind};
use crate::pool::ConnectionPool;
use crate::repository::{KvRepo, RecordsRepo};
use crate::schema::Schema;

/// High-level interface to the moderation records database.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open the database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Open the database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening records database at: {:?}", path);
        let pool = ConnectionPool::new(&path, Schema::Records)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory(Schema::Records)?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        Ok(data_dir()?.join("modgate.db"))
    }

    /// Trivial round-trip query.
    pub fn ping(&self) -> Result<()> {
        let conn = self.pool.get()?;
        KvRepo::ping(&conn)
    }

    /// Persist a classification result.
    ///
    /// Text is unique within its kind: a second result for the same text is
    /// dropped and the first row kept. Returns true if a row was written.
    pub fn save_record(
        &self,
        kind: RecordKind,
        text: &str,
        result: &serde_json::Value,
    ) -> Result<bool> {
        let conn = self.pool.get()?;

        let record = NewModerationRecord {
            kind,
            text: text.to_string(),
            result: serde_json::to_string(result)?,
        };

        RecordsRepo::insert_if_absent(&conn, &record)
    }

    /// Get the record stored for a text.
    pub fn get_record(&self, kind: RecordKind, text: &str) -> Result<Option<ModerationRecord>> {
        let conn = self.pool.get()?;
        RecordsRepo::get_by_text(&conn, kind, text)
    }

    /// Count stored records.
    pub fn count_records(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        RecordsRepo::count(&conn)
    }
}

/// A backing store that answers a trivial round trip.
pub trait Ping: Send + Sync {
    /// Returns an error if the store cannot be reached.
    fn ping(&self) -> Result<()>;
}

impl Ping for Database {
    fn ping(&self) -> Result<()> {
        Database::ping(self)
    }
}

/// Platform data directory for Modgate files.
pub(crate) fn data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "modgate", "modgate")
        .ok_or(StorageError::NoDataDir)?;

    Ok(proj_dirs.data_dir().to_path_buf())
}
