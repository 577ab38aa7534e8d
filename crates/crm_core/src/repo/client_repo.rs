//! Client repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `clients` store.
//! - Enforce email uniqueness at write time (the uniqueness guard).
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every write that sets or changes `email` runs its email-index lookup and
//!   its mutation inside one IMMEDIATE transaction. Splitting the two across
//!   transactions reintroduces the duplicate-email race.
//! - A failed operation rolls back; no partial write is ever visible.
//! - `id` is never supplied by callers and never rewritten by an update.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::client::{Client, ClientDraft, ClientId};
use rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CLIENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    phone
FROM clients";

const CLIENTS_TABLE: &str = "clients";
const EMAIL_INDEX: &str = "idx_clients_email";
const REQUIRED_COLUMNS: [&str; 4] = ["id", "name", "email", "phone"];
const REQUIRED_INDEXES: [&str; 3] = ["idx_clients_name", EMAIL_INDEX, "idx_clients_phone"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for client persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Engine unreachable, closed, or refused to open. Fatal to the session.
    Connection(DbError),
    /// A unique index rejected the value. Caller must resubmit another value.
    ConstraintViolation { field: &'static str, value: String },
    /// No record with this id.
    NotFound(ClientId),
    /// Engine failure mid-transaction; nothing was written.
    TransactionAbort(rusqlite::Error),
    /// Connection schema is not at a version this binary understands.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Required index is missing, or the email index lost its uniqueness.
    MissingRequiredIndex(&'static str),
}

impl RepoError {
    /// Whether the caller may continue the session after this error.
    ///
    /// Duplicate values and missing ids need a caller decision; aborted
    /// transactions may be retried from scratch. Everything else means the
    /// store is unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConstraintViolation { .. } | Self::NotFound(_) | Self::TransactionAbort(_)
        )
    }

    /// Stable, value-free code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::ConstraintViolation { .. } => "constraint_violation",
            Self::NotFound(_) => "not_found",
            Self::TransactionAbort(_) => "transaction_abort",
            Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::MissingRequiredIndex(_) => "schema_not_ready",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "storage connection error: {err}"),
            Self::ConstraintViolation { field, value } => {
                write!(f, "{field} `{value}` is already used by another client")
            }
            Self::NotFound(id) => write!(f, "client not found: {id}"),
            Self::TransactionAbort(err) => write!(f, "transaction aborted: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "client repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "client repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "client repository requires column `{column}` in table `{table}`"
            ),
            Self::MissingRequiredIndex(index) => {
                write!(f, "client repository requires index `{index}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) => Some(err),
            Self::TransactionAbort(err) => Some(err),
            Self::ConstraintViolation { .. }
            | Self::NotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::MissingRequiredIndex(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Connection(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::TransactionAbort(value)
    }
}

/// Snapshot of the store taken inside one read transaction.
///
/// Yields clients in ascending `id` order. Finite and not restartable; call
/// `list_clients` again for a fresh view.
#[derive(Debug)]
pub struct ClientSnapshot {
    clients: std::vec::IntoIter<Client>,
}

impl ClientSnapshot {
    fn new(clients: Vec<Client>) -> Self {
        Self {
            clients: clients.into_iter(),
        }
    }
}

impl Iterator for ClientSnapshot {
    type Item = Client;

    fn next(&mut self) -> Option<Self::Item> {
        self.clients.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.clients.size_hint()
    }
}

impl ExactSizeIterator for ClientSnapshot {}

/// Repository interface for client CRUD operations.
pub trait ClientRepository {
    /// Inserts a new client unless its email is taken; returns the new id.
    fn create_client(&self, draft: &ClientDraft) -> RepoResult<ClientId>;
    /// Replaces all editable fields of `id`, keeping `id` itself.
    fn update_client(&self, id: ClientId, draft: &ClientDraft) -> RepoResult<()>;
    /// Removes `id`. Returns whether a row existed; a missing id is not an error.
    fn delete_client(&self, id: ClientId) -> RepoResult<bool>;
    fn get_client(&self, id: ClientId) -> RepoResult<Client>;
    fn list_clients(&self) -> RepoResult<ClientSnapshot>;
    /// Looks a client up through the unique email index.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Client>>;
    fn count_clients(&self) -> RepoResult<usize>;
}

/// SQLite-backed client repository.
pub struct SqliteClientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClientRepository<'conn> {
    /// Wraps a connection the caller already verified with [`Self::try_new`]
    /// or [`ensure_client_connection_ready`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_client_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ClientRepository for SqliteClientRepository<'_> {
    fn create_client(&self, draft: &ClientDraft) -> RepoResult<ClientId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_email_available(&tx, &draft.email, None)?;

        tx.execute(
            "INSERT INTO clients (name, email, phone) VALUES (?1, ?2, ?3);",
            params![draft.name, draft.email, draft.phone],
        )
        .map_err(|err| map_write_error(err, &draft.email))?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(id)
    }

    fn update_client(&self, id: ClientId, draft: &ClientDraft) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let existing = load_client(&tx, id)?.ok_or(RepoError::NotFound(id))?;

        if existing.email != draft.email {
            ensure_email_available(&tx, &draft.email, Some(id))?;
        }

        tx.execute(
            "UPDATE clients
             SET
                name = ?2,
                email = ?3,
                phone = ?4
             WHERE id = ?1;",
            params![id, draft.name, draft.email, draft.phone],
        )
        .map_err(|err| map_write_error(err, &draft.email))?;

        tx.commit()?;
        Ok(())
    }

    fn delete_client(&self, id: ClientId) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM clients WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn get_client(&self, id: ClientId) -> RepoResult<Client> {
        load_client(self.conn, id)?.ok_or(RepoError::NotFound(id))
    }

    fn list_clients(&self) -> RepoResult<ClientSnapshot> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let clients = {
            let mut stmt = tx.prepare(&format!("{CLIENT_SELECT_SQL} ORDER BY id ASC;"))?;
            let rows = stmt.query_map([], parse_client_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;

        Ok(ClientSnapshot::new(clients))
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Client>> {
        let client = self
            .conn
            .query_row(
                &format!("{CLIENT_SELECT_SQL} INDEXED BY {EMAIL_INDEX} WHERE email = ?1;"),
                [email],
                parse_client_row,
            )
            .optional()?;
        Ok(client)
    }

    fn count_clients(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clients;", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Uniqueness guard: fails when another live record already holds `email`.
///
/// Must run on the same transaction as the write it protects. `excluding`
/// names the record being updated, which may legitimately keep its value.
fn ensure_email_available(
    tx: &Transaction<'_>,
    email: &str,
    excluding: Option<ClientId>,
) -> RepoResult<()> {
    let holder: Option<ClientId> = tx
        .query_row(
            &format!(
                "SELECT id
                 FROM clients INDEXED BY {EMAIL_INDEX}
                 WHERE email = ?1
                   AND (?2 IS NULL OR id <> ?2)
                 LIMIT 1;"
            ),
            params![email, excluding],
            |row| row.get(0),
        )
        .optional()?;

    match holder {
        Some(_) => Err(duplicate_email(email)),
        None => Ok(()),
    }
}

fn duplicate_email(email: &str) -> RepoError {
    RepoError::ConstraintViolation {
        field: "email",
        value: email.to_string(),
    }
}

// The email index is the only unique constraint callers can hit; `id` is
// engine-assigned.
fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == SQLITE_CONSTRAINT_UNIQUE =>
        {
            duplicate_email(email)
        }
        _ => RepoError::TransactionAbort(err),
    }
}

fn load_client(conn: &Connection, id: ClientId) -> RepoResult<Option<Client>> {
    let client = conn
        .query_row(
            &format!("{CLIENT_SELECT_SQL} WHERE id = ?1;"),
            [id],
            parse_client_row,
        )
        .optional()?;
    Ok(client)
}

fn parse_client_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
    })
}

/// Verifies `conn` carries the `clients` store, its columns and its indexes.
pub fn ensure_client_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version == 0 || actual_version > expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, CLIENTS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(CLIENTS_TABLE));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, CLIENTS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: CLIENTS_TABLE,
                column,
            });
        }
    }

    for index in REQUIRED_INDEXES {
        match index_uniqueness(conn, CLIENTS_TABLE, index)? {
            None => return Err(RepoError::MissingRequiredIndex(index)),
            Some(false) if index == EMAIL_INDEX => {
                return Err(RepoError::MissingRequiredIndex(index))
            }
            Some(_) => {}
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

/// `None` when the index is absent, otherwise whether it is UNIQUE.
fn index_uniqueness(conn: &Connection, table: &str, index: &str) -> RepoResult<Option<bool>> {
    let mut stmt = conn.prepare(&format!("PRAGMA index_list({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == index {
            let unique: i64 = row.get(2)?;
            return Ok(Some(unique == 1));
        }
    }
    Ok(None)
}
