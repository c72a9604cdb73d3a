//! Resource store contract and SQLite implementation.
//!
//! # Responsibility
//! - Translate create inputs, find-filters and update-patches into
//!   parameterized SQL and rebuild typed `Resource` values from rows.
//! - Remove resources whose creator no longer exists (`vacuum_resources`).
//!
//! # Invariants
//! - Create and update re-read the written row by id and fail with
//!   `RepoError::UnexpectedCount` unless exactly one row comes back.
//! - Delete does not check affected rows; it always runs the orphan sweep
//!   afterwards, and a failed sweep fails the delete.
//! - Payload bytes are fetched only when `FindResource::include_blob` is set.

use crate::db::DbError;
use crate::model::resource::{
    CreateResource, FindResource, MemoId, Resource, ResourceId, ResourceValidationError,
    UpdateResource, UserId,
};
use crate::repo::query::{build_list_statement, build_update_statement};
use log::{debug, error, info};
use rusqlite::{
    params, params_from_iter, Connection, InterruptHandle, Row, Transaction, TransactionBehavior,
};
use std::time::Instant;
use thiserror::Error;

const ORPHAN_SWEEP_SQL: &str = "DELETE FROM resource
 WHERE creator_id NOT IN (
    SELECT id FROM user
 );";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "resource",
        &[
            "id",
            "filename",
            "blob",
            "external_link",
            "type",
            "size",
            "creator_id",
            "created_ts",
            "updated_ts",
            "internal_path",
            "memo_id",
        ],
    ),
    ("user", &["id"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for resource persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ResourceValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("creator not found: {0}")]
    CreatorNotFound(UserId),
    #[error("update for resource {0} assigns no fields")]
    EmptyUpdate(ResourceId),
    /// Read-back after a write did not return exactly one row.
    #[error("unexpected resource count: {0}")]
    UnexpectedCount(usize),
    /// The row delete ran, but the orphan sweep after it failed.
    #[error("resource {deleted_id} deleted but orphan vacuum failed: {source}")]
    VacuumFailed {
        deleted_id: ResourceId,
        source: DbError,
    },
    #[error("invalid persisted resource data: {0}")]
    InvalidData(String),
    #[error("missing required table: {0}")]
    MissingRequiredTable(&'static str),
    #[error("missing required column {table}.{column}")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_input",
            Self::Db(_) => "db_error",
            Self::CreatorNotFound(_) => "creator_not_found",
            Self::EmptyUpdate(_) => "empty_update",
            Self::UnexpectedCount(_) => "unexpected_resource_count",
            Self::VacuumFailed { .. } => "vacuum_failed",
            Self::InvalidData(_) => "invalid_data",
            Self::MissingRequiredTable(_) | Self::MissingRequiredColumn { .. } => {
                "schema_not_ready"
            }
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract for resources.
pub trait ResourceStore {
    /// Inserts one resource and returns it as stored, without its payload.
    fn create_resource(&self, create: &CreateResource) -> RepoResult<Resource>;
    /// Lists matching resources, newest first.
    fn list_resources(&self, find: &FindResource) -> RepoResult<Vec<Resource>>;
    /// Applies a sparse patch and returns the resource as stored.
    ///
    /// An empty patch is rejected with `RepoError::EmptyUpdate`.
    fn update_resource(&self, update: &UpdateResource) -> RepoResult<Resource>;
    /// Deletes by id, then sweeps orphaned resources.
    ///
    /// Deleting a missing id succeeds. A `RepoError::VacuumFailed` means the
    /// row is already gone; any other error leaves the row state unknown.
    fn delete_resource(&self, id: ResourceId) -> RepoResult<()>;

    /// Returns the newest matching resource, if any.
    fn get_resource(&self, find: &FindResource) -> RepoResult<Option<Resource>> {
        Ok(self.list_resources(find)?.into_iter().next())
    }
}

/// SQLite-backed resource store borrowing a caller-owned connection.
///
/// The connection is not shared across threads; concurrent callers each
/// hold their own connection to the same database file.
pub struct SqliteResourceStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResourceStore<'conn> {
    /// Constructs a store after checking the connection carries the schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_resource_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Handle that aborts the statement currently running on this connection.
    ///
    /// The aborted call returns `RepoError::Db`.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    fn insert_resource(&self, create: &CreateResource) -> RepoResult<Resource> {
        create.validate()?;
        if !user_exists(self.conn, create.creator_id)? {
            return Err(RepoError::CreatorNotFound(create.creator_id));
        }

        self.conn.execute(
            "INSERT INTO resource (
                filename,
                blob,
                external_link,
                type,
                size,
                creator_id,
                internal_path
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                create.filename.as_str(),
                create.blob.as_deref(),
                create.external_link.as_deref(),
                create.kind.as_str(),
                create.size,
                create.creator_id,
                create.internal_path.as_deref(),
            ],
        )?;

        let rowid = self.conn.last_insert_rowid();
        let id = ResourceId::try_from(rowid).map_err(|_| {
            RepoError::InvalidData(format!("generated id `{rowid}` does not fit resource.id"))
        })?;
        self.read_back(id)
    }

    fn apply_update(&self, update: &UpdateResource) -> RepoResult<Resource> {
        let statement =
            build_update_statement(update).ok_or(RepoError::EmptyUpdate(update.id))?;
        self.conn
            .execute(&statement.sql, params_from_iter(statement.params))?;
        self.read_back(update.id)
    }

    fn query_resources(&self, find: &FindResource) -> RepoResult<Vec<Resource>> {
        let statement = build_list_statement(find);
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let mut rows = stmt.query(params_from_iter(statement.params))?;
        let mut resources = Vec::new();

        while let Some(row) = rows.next()? {
            resources.push(parse_resource_row(row, find.include_blob)?);
        }

        Ok(resources)
    }

    fn read_back(&self, id: ResourceId) -> RepoResult<Resource> {
        let mut resources = self.query_resources(&FindResource::by_id(id))?;
        if resources.len() != 1 {
            return Err(RepoError::UnexpectedCount(resources.len()));
        }
        Ok(resources.swap_remove(0))
    }

    fn vacuum_after_delete(&self, deleted_id: ResourceId) -> RepoResult<usize> {
        let sweep = || -> Result<usize, DbError> {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            let removed = delete_orphans(&tx)?;
            tx.commit()?;
            Ok(removed)
        };
        sweep().map_err(|source| RepoError::VacuumFailed { deleted_id, source })
    }
}

impl ResourceStore for SqliteResourceStore<'_> {
    fn create_resource(&self, create: &CreateResource) -> RepoResult<Resource> {
        let started_at = Instant::now();
        let resource = log_failure("resource_create", started_at, self.insert_resource(create))?;
        info!(
            "event=resource_create module=repo status=ok id={} creator_id={} size={} duration_ms={}",
            resource.id,
            resource.creator_id,
            resource.size,
            started_at.elapsed().as_millis()
        );
        Ok(resource)
    }

    fn list_resources(&self, find: &FindResource) -> RepoResult<Vec<Resource>> {
        let started_at = Instant::now();
        let resources = log_failure("resource_list", started_at, self.query_resources(find))?;
        debug!(
            "event=resource_list module=repo status=ok count={} include_blob={} duration_ms={}",
            resources.len(),
            find.include_blob,
            started_at.elapsed().as_millis()
        );
        Ok(resources)
    }

    fn update_resource(&self, update: &UpdateResource) -> RepoResult<Resource> {
        let started_at = Instant::now();
        let resource = log_failure("resource_update", started_at, self.apply_update(update))?;
        info!(
            "event=resource_update module=repo status=ok id={} duration_ms={}",
            resource.id,
            started_at.elapsed().as_millis()
        );
        Ok(resource)
    }

    fn delete_resource(&self, id: ResourceId) -> RepoResult<()> {
        let started_at = Instant::now();
        let deleted = log_failure(
            "resource_delete",
            started_at,
            self.conn
                .execute("DELETE FROM resource WHERE id = ?1;", [id])
                .map_err(RepoError::from),
        )?;
        let vacuumed = log_failure("resource_delete", started_at, self.vacuum_after_delete(id))?;
        info!(
            "event=resource_delete module=repo status=ok id={} deleted={} vacuumed={} duration_ms={}",
            id,
            deleted,
            vacuumed,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Deletes every resource whose `creator_id` has no matching user row.
///
/// Runs inside the caller's transaction so the user lookup and the delete
/// see the same snapshot; begin and commit belong to the caller. Returns the
/// number of rows removed.
pub fn vacuum_resources(tx: &Transaction<'_>) -> RepoResult<usize> {
    let started_at = Instant::now();
    let removed = log_failure(
        "resource_vacuum",
        started_at,
        delete_orphans(tx).map_err(RepoError::from),
    )?;
    info!(
        "event=resource_vacuum module=repo status=ok removed={} duration_ms={}",
        removed,
        started_at.elapsed().as_millis()
    );
    Ok(removed)
}

fn delete_orphans(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(ORPHAN_SWEEP_SQL, [])
}

fn log_failure<T>(event: &str, started_at: Instant, result: RepoResult<T>) -> RepoResult<T> {
    if let Err(err) = &result {
        error!(
            "event={event} module=repo status=error duration_ms={} error_code={} error={err}",
            started_at.elapsed().as_millis(),
            err.code()
        );
    }
    result
}

fn parse_resource_row(row: &Row<'_>, include_blob: bool) -> RepoResult<Resource> {
    // Not selected unless requested; NULL and "not fetched" both read as None.
    let blob = if include_blob {
        row.get::<_, Option<Vec<u8>>>("blob")?
    } else {
        None
    };

    Ok(Resource {
        id: row.get("id")?,
        filename: row.get("filename")?,
        blob,
        external_link: row.get("external_link")?,
        kind: row.get("type")?,
        size: row.get("size")?,
        creator_id: row.get("creator_id")?,
        created_ts: row.get("created_ts")?,
        updated_ts: row.get("updated_ts")?,
        internal_path: row.get("internal_path")?,
        memo_id: row.get::<_, Option<MemoId>>("memo_id")?,
    })
}

fn user_exists(conn: &Connection, user_id: UserId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM user
            WHERE id = ?1
        );",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_resource_connection_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
