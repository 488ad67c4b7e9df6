//! Modgate Storage - SQLite persistence layer.
//!
//! This crate provides the two databases Modgate runs on:
//!
//! - [`Database`]: moderation records, one row per unique submission key
//! - [`SharedStore`]: the result cache and running counters (via
//!   [`KeyValueStore`]), the task queue with its result store, and worker
//!   heartbeats
//!
//! # Example
//!
//! ```no_run
//! use modgate_storage::{Database, KeyValueStore, RecordKind, SharedStore};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let db = Database::in_memory().unwrap();
//! db.save_record(RecordKind::Text, "hello", &json!({"flagged": false})).unwrap();
//!
//! let store = SharedStore::in_memory().unwrap();
//! store.set_ex("moderation:hello", "{}", Duration::from_secs(3600)).unwrap();
//! store.incr("cached_requests").unwrap();
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;
mod store;

pub use database::{Database, Ping};
pub use error::{Result, StorageError};
pub use models::{ModerationRecord, NewModerationRecord, RecordKind, TaskRecord, TaskStatus};
pub use pool::{ConnectionPool, PooledConnection};
pub use schema::Schema;
pub use store::{KeyValueStore, SharedStore};
