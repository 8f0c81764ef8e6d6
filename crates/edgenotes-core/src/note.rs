//! The note record persisted by the repository.

use serde::{Deserialize, Serialize};

/// Discriminates the two note shapes: text notes carry required
/// content, image notes carry a required blob key plus an optional
/// caption in `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Text,
    Image,
}

impl NoteKind {
    /// The value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Text => "text",
            NoteKind::Image => "image",
        }
    }

    /// Parse the stored column value. Anything else is a corrupt row.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(NoteKind::Text),
            "image" => Some(NoteKind::Image),
            _ => None,
        }
    }
}

/// A persisted note. Created once, never updated, never deleted.
///
/// JSON field names match the wire format consumed by the UI:
/// `type`, `content`, `imageKey`, `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub content: Option<String>,
    #[serde(rename = "imageKey")]
    pub image_key: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Random, collision-resistant note id.
pub fn generate_note_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Creation timestamp, ISO-8601 UTC with millisecond precision.
/// Doubles as the descending sort key for listings.
pub fn timestamp_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
