//! Parameterized reads and writes for the notes table.

use std::sync::Arc;

use crate::db::{Database, DbError, SqlRow, SqlValue};
use crate::note::{Note, NoteKind};
use crate::schema::SchemaBootstrap;

const INSERT_NOTE_SQL: &str = "\
INSERT INTO notes (id, type, content, image_key, created_at)
VALUES (?1, ?2, ?3, ?4, ?5)";

const LIST_NOTES_SQL: &str = "\
SELECT id, type, content, image_key, created_at
FROM notes
ORDER BY datetime(created_at) DESC";

/// Executes note statements against whichever [`Database`] backend the
/// adapter wired in. Schema creation is lazy: both operations run the
/// bootstrap before touching the table.
pub struct NoteRepository {
    db: Arc<dyn Database>,
    schema: Arc<SchemaBootstrap>,
}

impl NoteRepository {
    pub fn new(db: Arc<dyn Database>, schema: Arc<SchemaBootstrap>) -> Self {
        Self { db, schema }
    }

    /// Insert a validated note. Callers validate before calling; this
    /// method only binds parameters and executes.
    pub async fn insert(&self, note: &Note) -> Result<(), DbError> {
        self.schema.ensure(self.db.as_ref()).await?;
        let params = [
            SqlValue::from(note.id.as_str()),
            SqlValue::from(note.kind.as_str()),
            SqlValue::from_optional_text(note.content.as_deref()),
            SqlValue::from_optional_text(note.image_key.as_deref()),
            SqlValue::from(note.created_at.as_str()),
        ];
        self.db.execute(INSERT_NOTE_SQL, &params).await
    }

    /// All notes, newest first. Strict: errors propagate.
    pub async fn list(&self) -> Result<Vec<Note>, DbError> {
        self.schema.ensure(self.db.as_ref()).await?;
        let rows = self.db.query_all(LIST_NOTES_SQL, &[]).await?;
        rows.iter().map(note_from_row).collect()
    }

    /// Degraded read used to keep the page renderable: failures are
    /// logged and swallowed, the caller gets an empty listing.
    pub async fn list_or_empty(&self) -> Vec<Note> {
        match self.list().await {
            Ok(notes) => notes,
            Err(err) => {
                log::warn!("unable to list notes, serving empty listing: {err}");
                Vec::new()
            }
        }
    }
}

fn note_from_row(row: &SqlRow) -> Result<Note, DbError> {
    let kind_text = row.text("type")?;
    let kind = NoteKind::parse(kind_text)
        .ok_or_else(|| DbError::column("type", format!("unknown note type {kind_text:?}")))?;
    Ok(Note {
        id: row.text("id")?.to_string(),
        kind,
        content: row.optional_text("content")?.map(str::to_string),
        image_key: row.optional_text("image_key")?.map(str::to_string),
        created_at: row.text("created_at")?.to_string(),
    })
}
