//! Client-resident contact store.
//!
//! Contacts persist in an embedded SQLite database behind one long-lived
//! connection. Email uniqueness is enforced inside the write transactions of
//! the store itself; there is no other authority to ask.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{DbError, DbLocation, DbResult, Handle, OpenOptions};
pub use logging::{default_log_level, flush_logs, init_logging, logging_status, LoggingError};
pub use model::client::{
    Client, ClientDraft, ClientField, ClientId, ClientValidationError, ValidationReason,
};
pub use repo::client_repo::{
    ClientRepository, ClientSnapshot, RepoError, RepoResult, SqliteClientRepository,
};
pub use service::client_service::ClientService;
pub use service::edit_session::{EditMode, EditSession, SubmitError, SubmitOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
