//! Embedded SQLite backend.
//!
//! Used for local development and tests. The credential file's host line is
//! the database path (or `:memory:`); the remaining lines are ignored.

use rusqlite::{types::ValueRef, Connection, OpenFlags};
use tracing::debug;

use crate::core::db::connection::{ConnectFailure, Connector, DbConnection};
use crate::core::db::query::{QueryResult, NULL_TEXT};
use crate::core::error::CR_UNKNOWN_ERROR;
use crate::credentials::Credentials;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn open(
        &self,
        credentials: &Credentials,
        _port: Option<u16>,
    ) -> Result<Box<dyn DbConnection>, ConnectFailure> {
        let path = credentials.host.as_str();
        if path.is_empty() {
            return Err(ConnectFailure {
                code: CR_UNKNOWN_ERROR,
                message: "no database path given".to_string(),
            });
        }

        // Opening must not create missing files, the same way a MySQL
        // server refuses an unknown host.
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let opened = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open_with_flags(path, flags)
        };
        let conn = opened.map_err(|e| ConnectFailure {
            code: sqlite_code(&e),
            message: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ConnectFailure {
                code: sqlite_code(&e),
                message: e.to_string(),
            })?;

        debug!(path, "sqlite connection established");
        Ok(Box::new(SqliteConnection { conn }))
    }
}

pub struct SqliteConnection {
    conn: Connection,
}

impl DbConnection for SqliteConnection {
    fn ping(&mut self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn execute(&mut self, sql: &str) -> Result<QueryResult, String> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| format!("Failed to prepare statement: {}", e))?;

        let column_count = stmt.column_count();
        if column_count == 0 {
            let before = self.conn.last_insert_rowid();
            let affected = stmt
                .execute([])
                .map_err(|e| format!("Statement execution failed: {}", e))?;
            // The rowid is connection-wide; only an insert by this statement moves it.
            let rowid = self.conn.last_insert_rowid();
            let inserted = (affected > 0 && rowid != before)
                .then(|| u64::try_from(rowid).ok())
                .flatten()
                .filter(|id| *id > 0);
            return Ok(QueryResult::modified(affected as u64, inserted));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(format_value(row.get_ref(i)?));
                }
                Ok(values)
            })
            .map_err(|e| format!("Query execution failed: {}", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Result processing failed: {}", e))?;

        Ok(QueryResult::new(columns, rows))
    }
}

fn sqlite_code(err: &rusqlite::Error) -> u16 {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            u16::try_from(e.extended_code).unwrap_or(CR_UNKNOWN_ERROR)
        }
        _ => CR_UNKNOWN_ERROR,
    }
}

/// Formats a SQLite value for display
fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => NULL_TEXT.to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn memory() -> Box<dyn DbConnection> {
        SqliteConnector
            .open(&Credentials::parse(":memory:"), None)
            .ok()
            .unwrap()
    }

    #[test]
    fn test_select_one() {
        let mut conn = memory();
        assert!(conn.ping());
        let result = conn.execute("SELECT 1").unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.scalar(), Some("1"));
    }

    #[test]
    fn test_modify_and_read_back() {
        let mut conn = memory();
        conn.execute("CREATE TABLE runs (id INTEGER PRIMARY KEY, name TEXT, fitness REAL, data BLOB)")
            .unwrap();
        let inserted = conn
            .execute("INSERT INTO runs (name, fitness, data) VALUES ('lstm', 0.25, X'0102'), (NULL, NULL, NULL)")
            .unwrap();
        assert_eq!(inserted.affected_rows, 2);
        assert_eq!(inserted.last_insert_id, Some(2));

        let result = conn.execute("SELECT * FROM runs ORDER BY id").unwrap();
        assert_eq!(result.columns, vec!["id", "name", "fitness", "data"]);
        assert_eq!(result.rows[0], vec!["1", "lstm", "0.25", "<BLOB: 2 bytes>"]);
        assert_eq!(result.rows[1], vec!["2", "NULL", "NULL", "NULL"]);
    }

    #[test]
    fn test_insert_id_only_for_inserts() {
        let mut conn = memory();
        let created = conn.execute("CREATE TABLE runs (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
        assert_eq!(created.last_insert_id, None);

        let inserted = conn.execute("INSERT INTO runs (name) VALUES ('lstm')").unwrap();
        assert_eq!(inserted.last_insert_id, Some(1));

        let updated = conn.execute("UPDATE runs SET name = 'gru' WHERE id = 1").unwrap();
        assert_eq!(updated.affected_rows, 1);
        assert_eq!(updated.last_insert_id, None);

        let deleted = conn.execute("DELETE FROM runs").unwrap();
        assert_eq!(deleted.affected_rows, 1);
        assert_eq!(deleted.last_insert_id, None);
    }

    #[test]
    fn test_query_error() {
        let mut conn = memory();
        let err = conn.execute("SELECT * FROM nonexistent_table").unwrap_err();
        assert!(err.contains("no such table"));
    }

    #[test]
    fn test_missing_file_is_not_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let creds = Credentials::parse(path.to_str().unwrap());
        let failure = SqliteConnector.open(&creds, None).err().unwrap();
        assert!(failure.code > 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_host_fails() {
        let failure = SqliteConnector.open(&Credentials::default(), None).err().unwrap();
        assert_eq!(failure.code, CR_UNKNOWN_ERROR);
    }
}
