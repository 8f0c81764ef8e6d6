//! Cloudflare D1 implementation of the core database trait.

use async_trait::async_trait;
use worker::wasm_bindgen::JsValue;
use worker::{D1Database, Env};

use edgenotes_core::bindings::DB_BINDING;
use edgenotes_core::db::{Database, DbError, SqlRow, SqlValue};

/// The `DB` D1 binding wrapped behind [`Database`].
pub struct D1Store {
    db: D1Database,
}

impl D1Store {
    pub fn new(db: D1Database) -> Self {
        Self { db }
    }

    /// The `DB` binding, or `None` when the deployment has none.
    pub fn from_env(env: &Env) -> Option<Self> {
        env.d1(DB_BINDING).ok().map(Self::new)
    }
}

fn to_js(value: &SqlValue) -> JsValue {
    match value {
        SqlValue::Null => JsValue::NULL,
        SqlValue::Integer(i) => JsValue::from_f64(*i as f64),
        SqlValue::Real(r) => JsValue::from_f64(*r),
        SqlValue::Text(t) => JsValue::from_str(t),
    }
}

fn from_json(column: &str, value: &serde_json::Value) -> Result<SqlValue, DbError> {
    match value {
        serde_json::Value::Null => Ok(SqlValue::Null),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| DbError::column(column, "unrepresentable number")),
        },
        serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
        other => Err(DbError::column(column, format!("unexpected value {other}"))),
    }
}

fn statement_error(err: worker::Error) -> DbError {
    DbError::statement(err.to_string())
}

#[async_trait(?Send)]
impl Database for D1Store {
    async fn exec_batch(&self, sql: &str) -> Result<(), DbError> {
        // D1's exec endpoint treats every line as its own statement, so
        // multi-line DDL goes through prepared statements instead.
        for statement in sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            self.db
                .prepare(statement)
                .run()
                .await
                .map_err(statement_error)?;
        }
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), DbError> {
        let values: Vec<JsValue> = params.iter().map(to_js).collect();
        self.db
            .prepare(sql)
            .bind(&values)
            .map_err(statement_error)?
            .run()
            .await
            .map_err(statement_error)?;
        Ok(())
    }

    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
        let values: Vec<JsValue> = params.iter().map(to_js).collect();
        let result = self
            .db
            .prepare(sql)
            .bind(&values)
            .map_err(statement_error)?
            .all()
            .await
            .map_err(statement_error)?;

        let raw: Vec<serde_json::Map<String, serde_json::Value>> =
            result.results().map_err(statement_error)?;

        let mut rows = Vec::with_capacity(raw.len());
        for object in raw {
            let mut row = SqlRow::new();
            for (column, value) in &object {
                row.insert(column.clone(), from_json(column, value)?);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
