//! Lazy, single-flight creation of the notes table.
//!
//! The schema is created on first use rather than by a migration step,
//! so a freshly provisioned database works without any setup command.
//! The DDL is idempotent (`IF NOT EXISTS`), but issuing it once per
//! process keeps the hot path to a single memo check.

use std::sync::{Arc, OnceLock};

use futures::lock::Mutex;

use crate::db::{Database, DbError};

pub const CREATE_NOTES_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL CHECK (type IN ('text', 'image')),
    content TEXT,
    image_key TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);";

pub const CREATE_NOTES_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at DESC);";

/// Single-flight memo for schema creation.
///
/// The first caller runs the DDL while holding the async lock;
/// concurrent callers queue on the lock and observe the completed flag
/// instead of issuing duplicate DDL. If the DDL fails the flag stays
/// unset, so the next caller retries from scratch — one failed attempt
/// does not poison the process.
pub struct SchemaBootstrap {
    done: Mutex<bool>,
}

impl SchemaBootstrap {
    pub fn new() -> Self {
        Self {
            done: Mutex::new(false),
        }
    }

    /// The process-wide instance. Every repository constructed through
    /// [`crate::service::NotesApp`] shares this memo, matching the
    /// once-per-process contract.
    pub fn shared() -> Arc<SchemaBootstrap> {
        static SHARED: OnceLock<Arc<SchemaBootstrap>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(SchemaBootstrap::new()))
            .clone()
    }

    /// Ensure the notes table and its index exist.
    pub async fn ensure(&self, db: &dyn Database) -> Result<(), DbError> {
        let mut done = self.done.lock().await;
        if *done {
            return Ok(());
        }
        db.exec_batch(CREATE_NOTES_TABLE_SQL).await?;
        db.exec_batch(CREATE_NOTES_INDEX_SQL).await?;
        *done = true;
        Ok(())
    }
}

impl Default for SchemaBootstrap {
    fn default() -> Self {
        Self::new()
    }
}
