//! SQLite implementation of the database seam.
//!
//! Local stand-in for D1, which speaks the same dialect. The rusqlite
//! connection is synchronous; calls complete without suspending, so a
//! `std::sync::Mutex` around the connection is enough.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use edgenotes_core::db::{Database, DbError, SqlRow, SqlValue};
use rusqlite::types::Value as SqliteValue;
use rusqlite::Connection;

/// A database backend over a single rusqlite connection.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)
            .map_err(|err| DbError::statement(format!("failed to open database: {err}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database. Used by tests and the
    /// `:memory:` dev configuration.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()
            .map_err(|err| DbError::statement(format!("failed to open database: {err}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, converting a poisoned lock into `DbError`.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|_| DbError::Internal(anyhow::anyhow!("database lock poisoned")))
    }
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(i) => SqliteValue::Integer(*i),
        SqlValue::Real(r) => SqliteValue::Real(*r),
        SqlValue::Text(t) => SqliteValue::Text(t.clone()),
    }
}

fn from_sqlite(column: &str, value: SqliteValue) -> Result<SqlValue, DbError> {
    match value {
        SqliteValue::Null => Ok(SqlValue::Null),
        SqliteValue::Integer(i) => Ok(SqlValue::Integer(i)),
        SqliteValue::Real(r) => Ok(SqlValue::Real(r)),
        SqliteValue::Text(t) => Ok(SqlValue::Text(t)),
        SqliteValue::Blob(_) => Err(DbError::column(column, "unexpected blob value")),
    }
}

fn statement_error(err: rusqlite::Error) -> DbError {
    DbError::statement(err.to_string())
}

#[async_trait(?Send)]
impl Database for SqliteDatabase {
    async fn exec_batch(&self, sql: &str) -> Result<(), DbError> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql).map_err(statement_error)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), DbError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql).map_err(statement_error)?;
        stmt.execute(rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(statement_error)?;
        Ok(())
    }

    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql).map_err(statement_error)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(statement_error)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(statement_error)? {
            let mut sql_row = SqlRow::new();
            for (index, column) in columns.iter().enumerate() {
                let value: SqliteValue = row.get(index).map_err(statement_error)?;
                sql_row.insert(column.clone(), from_sqlite(column, value)?);
            }
            out.push(sql_row);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgenotes_core::schema::{CREATE_NOTES_INDEX_SQL, CREATE_NOTES_TABLE_SQL};

    fn db_with_schema() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        futures::executor::block_on(async {
            db.exec_batch(CREATE_NOTES_TABLE_SQL).await.unwrap();
            db.exec_batch(CREATE_NOTES_INDEX_SQL).await.unwrap();
        });
        db
    }

    #[tokio::test]
    async fn ddl_is_idempotent() {
        let db = db_with_schema();
        db.exec_batch(CREATE_NOTES_TABLE_SQL).await.unwrap();
        db.exec_batch(CREATE_NOTES_INDEX_SQL).await.unwrap();
    }

    #[tokio::test]
    async fn execute_and_query_round_trip_nullable_columns() {
        let db = db_with_schema();
        db.execute(
            "INSERT INTO notes (id, type, content, image_key, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                SqlValue::from("n1"),
                SqlValue::from("text"),
                SqlValue::from("hello"),
                SqlValue::Null,
                SqlValue::from("2026-01-01T00:00:00.000Z"),
            ],
        )
        .await
        .unwrap();

        let rows = db
            .query_all("SELECT id, content, image_key FROM notes", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("id").unwrap(), "n1");
        assert_eq!(rows[0].optional_text("content").unwrap(), Some("hello"));
        assert_eq!(rows[0].optional_text("image_key").unwrap(), None);
    }

    #[tokio::test]
    async fn check_constraint_rejects_unknown_type() {
        let db = db_with_schema();
        let result = db
            .execute(
                "INSERT INTO notes (id, type, created_at) VALUES (?1, ?2, ?3)",
                &[
                    SqlValue::from("n1"),
                    SqlValue::from("audio"),
                    SqlValue::from("2026-01-01T00:00:00.000Z"),
                ],
            )
            .await;
        assert!(matches!(result, Err(DbError::Statement { .. })));
    }

    #[tokio::test]
    async fn created_at_default_fills_in() {
        let db = db_with_schema();
        db.execute(
            "INSERT INTO notes (id, type, content) VALUES (?1, ?2, ?3)",
            &[
                SqlValue::from("n1"),
                SqlValue::from("text"),
                SqlValue::from("hello"),
            ],
        )
        .await
        .unwrap();

        let rows = db
            .query_all("SELECT created_at FROM notes", &[])
            .await
            .unwrap();
        assert!(rows[0].text("created_at").unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn open_creates_a_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.sqlite3");
        let db = SqliteDatabase::open(&path).unwrap();
        db.exec_batch(CREATE_NOTES_TABLE_SQL).await.unwrap();
        assert!(path.exists());
    }
}
