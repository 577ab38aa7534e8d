//! Open-time configuration for the contact database.

use super::migrations::latest_version;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Logical database name; the file-backed default is `<name>.sqlite3`.
pub const DEFAULT_DB_NAME: &str = "CRM_Database";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// SQLite file on disk; survives process restarts.
    File(PathBuf),
    /// Private in-memory database, dropped with the connection.
    Memory,
}

impl DbLocation {
    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Parameters for [`crate::db::Handle::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub location: DbLocation,
    /// Schema version to open at. Must be in `1..=latest_version()`.
    pub schema_version: u32,
    /// How long SQLite waits on a locked file before failing.
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            location: DbLocation::File(PathBuf::from(format!("{DEFAULT_DB_NAME}.sqlite3"))),
            schema_version: latest_version(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl OpenOptions {
    /// File-backed database at `path`, latest schema version.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: DbLocation::File(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// In-memory database, latest schema version.
    pub fn memory() -> Self {
        Self {
            location: DbLocation::Memory,
            ..Self::default()
        }
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}
