use crm_core::db::migrations::latest_version;
use crm_core::db::{open_db, open_db_at_version, open_db_in_memory, DbError};
use crm_core::{ClientDraft, ClientRepository, RepoError, SqliteClientRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_store_and_indexes() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "clients");
    assert_eq!(
        index_list(&conn),
        vec![
            ("idx_clients_email".to_string(), true),
            ("idx_clients_name".to_string(), false),
            ("idx_clients_phone".to_string(), false),
        ]
    );
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.sqlite3");

    let conn_first = open_db(&path).unwrap();
    let id = SqliteClientRepository::try_new(&conn_first)
        .unwrap()
        .create_client(&ClientDraft::new("Ana Pérez", "ana@example.com", "555-0101"))
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_eq!(object_count(&conn_second, "table", "clients"), 1);
    assert_eq!(index_list(&conn_second).len(), 3);

    let repo = SqliteClientRepository::try_new(&conn_second).unwrap();
    assert_eq!(repo.get_client(id).unwrap().email, "ana@example.com");
}

#[test]
fn replaying_upgrade_on_existing_store_keeps_data_and_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.sqlite3");

    let conn = open_db(&path).unwrap();
    SqliteClientRepository::try_new(&conn)
        .unwrap()
        .create_client(&ClientDraft::new("Luis Gómez", "luis@example.com", "555-0102"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 0;").unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened), latest_version());
    assert_eq!(index_list(&reopened).len(), 3);
    let repo = SqliteClientRepository::try_new(&reopened).unwrap();
    assert_eq!(repo.count_clients().unwrap(), 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_at_version_zero_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.sqlite3");

    assert!(matches!(
        open_db_at_version(&path, 0),
        Err(DbError::InvalidSchemaVersion)
    ));
}

#[test]
fn requesting_unknown_version_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crm.sqlite3");

    let err = open_db_at_version(&path, latest_version() + 1).unwrap_err();
    assert!(matches!(err, DbError::UnknownSchemaVersion { .. }));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    assert_eq!(object_count(&conn, "table", "clients"), 0);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteClientRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_clients_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteClientRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("clients"))
    ));
}

#[test]
fn repository_rejects_connection_missing_phone_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteClientRepository::try_new(&conn),
        Err(RepoError::MissingRequiredColumn {
            table: "clients",
            column: "phone"
        })
    ));
}

#[test]
fn repository_rejects_non_unique_email_index() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE clients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL
        );
        CREATE INDEX idx_clients_name ON clients (name);
        CREATE INDEX idx_clients_email ON clients (email);
        CREATE INDEX idx_clients_phone ON clients (phone);",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let err = SqliteClientRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredIndex("idx_clients_email")));
    assert!(!err.is_recoverable());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn object_count(conn: &Connection, kind: &str, name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2;",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}

fn index_list(conn: &Connection) -> Vec<(String, bool)> {
    let mut stmt = conn
        .prepare(
            "SELECT name, \"unique\"
             FROM pragma_index_list('clients')
             WHERE origin = 'c'
             ORDER BY name;",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? == 1))
        })
        .unwrap();
    let indexes: Vec<(String, bool)> = rows.map(Result::unwrap).collect();
    indexes
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_eq!(
        object_count(conn, "table", table_name),
        1,
        "table {table_name} does not exist"
    );
}
