//! SQLite storage bootstrap for the resource store.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by `SqliteResourceStore`.
//! - Apply the bundled schema before any resource row is touched.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - `resource.creator_id` has no foreign key; orphans are repaired by
//!   `vacuum_resources` instead of a storage-level cascade.

use thiserror::Error;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}
