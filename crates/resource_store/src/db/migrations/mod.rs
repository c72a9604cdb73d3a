//! The bundled resource schema (`0001_init.sql`) and its one-time install.
//!
//! `PRAGMA user_version` is 0 on a fresh database and `SCHEMA_VERSION` once
//! the script has run; anything higher was written by a newer build.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, TransactionBehavior};

const SCHEMA_VERSION: u32 = 1;
const SCHEMA_SQL: &str = include_str!("0001_init.sql");

/// Schema version this build installs and understands.
pub fn latest_version() -> u32 {
    SCHEMA_VERSION
}

/// Installs the resource schema unless the database already carries it.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    if ensure_supported(conn)? == SCHEMA_VERSION {
        return Ok(());
    }

    // Immediate so two connections opening the same fresh file serialize,
    // and the loser sees the winner's version below.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if ensure_supported(&tx)? < SCHEMA_VERSION {
        tx.execute_batch(SCHEMA_SQL)?;
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }
    tx.commit()?;

    Ok(())
}

fn ensure_supported(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    if version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: SCHEMA_VERSION,
        });
    }
    Ok(version)
}
