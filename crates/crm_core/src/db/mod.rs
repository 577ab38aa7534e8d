//! SQLite storage bootstrap, schema management and the connection handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the contact store.
//! - Apply schema migrations in deterministic order, exactly once per version.
//! - Own the single long-lived connection behind an async [`Handle`].
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Exactly one connection serves every repository call of a `Handle`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod handle;
pub mod migrations;
mod open;
mod options;

pub use handle::Handle;
pub use open::{open_db, open_db_at_version, open_db_in_memory, open_with_options};
pub use options::{DbLocation, OpenOptions, DEFAULT_DB_NAME};

pub type DbResult<T> = Result<T, DbError>;

/// Failures raised while opening or talking to the storage engine.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Schema version `0` was requested; versions start at 1.
    InvalidSchemaVersion,
    /// Requested version is newer than any migration this binary carries.
    UnknownSchemaVersion {
        requested: u32,
        latest_supported: u32,
    },
    /// On-disk schema was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// On-disk schema is newer than the version the caller asked for.
    VersionDowngrade { db_version: u32, requested: u32 },
    /// The worker thread owning the connection could not be started.
    WorkerSpawn(std::io::Error),
    /// The worker thread is gone; the handle can no longer reach the engine.
    ConnectionClosed,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidSchemaVersion => write!(f, "schema version must be at least 1"),
            Self::UnknownSchemaVersion {
                requested,
                latest_supported,
            } => write!(
                f,
                "requested schema version {requested} is unknown; latest supported is {latest_supported}"
            ),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::VersionDowngrade {
                db_version,
                requested,
            } => write!(
                f,
                "database schema version {db_version} is newer than requested {requested}"
            ),
            Self::WorkerSpawn(err) => write!(f, "failed to spawn storage worker: {err}"),
            Self::ConnectionClosed => write!(f, "storage connection is closed"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::WorkerSpawn(err) => Some(err),
            Self::InvalidSchemaVersion
            | Self::UnknownSchemaVersion { .. }
            | Self::UnsupportedSchemaVersion { .. }
            | Self::VersionDowngrade { .. }
            | Self::ConnectionClosed => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
