//! Provider-neutral SQL database abstraction.
//!
//! # Architecture
//!
//! ```text
//!  NoteRepository / SchemaBootstrap
//!            │
//!       Arc<dyn Database>   (object-safe, SqlValue rows)
//!            │
//!     ┌──────┴───────┐
//!     ▼              ▼
//!  D1Database     SqliteDatabase
//!  (cloudflare)   (axum / local dev)
//! ```
//!
//! The trait deliberately mirrors the small slice of the D1 surface the
//! app needs: raw statement execution for DDL, one parameterized write,
//! one parameterized read. Platform handles on wasm are not `Send`, so
//! the trait carries no `Send + Sync` supertrait; adapters that share
//! state across threads hold their concrete store types instead.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::NoteError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors returned by database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database binding is missing from the hosting context.
    #[error("database binding {binding} is not configured")]
    Unavailable { binding: &'static str },

    /// A statement failed to execute.
    #[error("statement failed: {message}")]
    Statement { message: String },

    /// A result row is missing a column or holds an unexpected type.
    #[error("bad column {column}: {message}")]
    Column { column: String, message: String },

    /// A general internal error.
    #[error("database error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DbError {
    pub fn statement(message: impl Into<String>) -> Self {
        DbError::Statement {
            message: message.into(),
        }
    }

    pub fn column(column: impl Into<String>, message: impl Into<String>) -> Self {
        DbError::Column {
            column: column.into(),
            message: message.into(),
        }
    }
}

impl From<DbError> for NoteError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Unavailable { binding } => NoteError::binding_unavailable(binding),
            other => NoteError::internal(anyhow::Error::new(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Values and rows
// ---------------------------------------------------------------------------

/// A SQL parameter or column value, covering the SQLite/D1 storage
/// classes the notes table uses.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// NULL for `None`, TEXT otherwise. Nullable columns round-trip
    /// through this — an absent value is never stored as `""`.
    pub fn from_optional_text(value: Option<&str>) -> Self {
        match value {
            Some(text) => SqlValue::Text(text.to_string()),
            None => SqlValue::Null,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    columns: HashMap<String, SqlValue>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, SqlValue)>,
        K: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Required TEXT column. Missing or non-text values are an error.
    pub fn text(&self, column: &str) -> Result<&str, DbError> {
        match self.columns.get(column) {
            Some(SqlValue::Text(text)) => Ok(text),
            Some(other) => Err(DbError::column(column, format!("expected text, got {other:?}"))),
            None => Err(DbError::column(column, "missing")),
        }
    }

    /// Nullable TEXT column: NULL and absent both map to `None`.
    pub fn optional_text(&self, column: &str) -> Result<Option<&str>, DbError> {
        match self.columns.get(column) {
            Some(SqlValue::Text(text)) => Ok(Some(text)),
            Some(SqlValue::Null) | None => Ok(None),
            Some(other) => Err(DbError::column(column, format!("expected text, got {other:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Object-safe interface for SQL database backends.
///
/// All methods take `&self`; backends handle interior mutability and
/// locking themselves.
///
/// Implementations exist per adapter:
/// - `D1Store` (cloudflare adapter): Cloudflare D1
/// - `SqliteDatabase` (axum adapter): local dev / tests via rusqlite
#[async_trait(?Send)]
pub trait Database {
    /// Execute raw SQL without parameters. Used for DDL.
    async fn exec_batch(&self, sql: &str) -> Result<(), DbError>;

    /// Execute a parameterized statement, discarding any result rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), DbError>;

    /// Run a parameterized query and collect every result row.
    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError>;
}
