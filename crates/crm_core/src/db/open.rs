//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections are migrated to exactly the requested version.

use super::migrations::apply_migrations_to;
use super::options::{DbLocation, OpenOptions};
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with_options(&OpenOptions::file(path))
}

/// Opens a SQLite database file and migrates it to `version`.
///
/// Fails instead of downgrading when the file is already newer.
pub fn open_db_at_version(path: impl AsRef<Path>, version: u32) -> DbResult<Connection> {
    open_with_options(&OpenOptions::file(path).with_schema_version(version))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with_options(&OpenOptions::memory())
}

/// Opens a connection as described by `options`.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_with_options(options: &OpenOptions) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = options.location.mode();
    info!(
        "event=db_open module=db status=start mode={} schema_version={}",
        mode, options.schema_version
    );

    let opened = match &options.location {
        DbLocation::File(path) => Connection::open(path),
        DbLocation::Memory => Connection::open_in_memory(),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, options.schema_version, options.busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    schema_version: u32,
    busy_timeout: Duration,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations_to(conn, schema_version)?;
    Ok(())
}
