//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically, up to a requested version.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Migration SQL is re-entrant (`IF NOT EXISTS`); replaying a step against
//!   an already-upgraded store creates nothing and fails nothing.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_clients.sql"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies pending migrations up to and including `target`.
///
/// # Errors
/// - `InvalidSchemaVersion` when `target` is 0.
/// - `UnknownSchemaVersion` when `target` is newer than [`latest_version`].
/// - `UnsupportedSchemaVersion` when the file was written by a newer binary.
/// - `VersionDowngrade` when the file is newer than `target`.
pub fn apply_migrations_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    apply_steps(conn, MIGRATIONS, target)
}

fn apply_steps(conn: &mut Connection, steps: &[Migration], target: u32) -> DbResult<()> {
    let latest = steps.last().map_or(0, |migration| migration.version);
    if target == 0 {
        return Err(DbError::InvalidSchemaVersion);
    }
    if target > latest {
        return Err(DbError::UnknownSchemaVersion {
            requested: target,
            latest_supported: latest,
        });
    }

    let current_version = current_user_version(conn)?;
    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }
    if current_version > target {
        return Err(DbError::VersionDowngrade {
            db_version: current_version,
            requested: target,
        });
    }

    if current_version == target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in steps {
        if migration.version <= current_version || migration.version > target {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_upgrade module=db status=ok from_version={} to_version={}",
        current_version, target
    );
    Ok(())
}

/// Reads the schema version recorded in the database file.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
