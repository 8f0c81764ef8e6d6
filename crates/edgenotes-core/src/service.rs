//! Request-handling logic shared by every adapter.
//!
//! Adapters parse their platform's request into [`CreateNoteForm`] /
//! a key string, call into [`NotesApp`], and render the typed results.
//! Validation happens here, before any side effect; repository and
//! blob-store calls happen here too, so the adapters stay thin.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::bindings::{BindingStatus, Bindings};
use crate::blob::{image_object_key, BlobObject};
use crate::error::NoteError;
use crate::note::{generate_note_id, timestamp_now, Note, NoteKind};
use crate::repo::NoteRepository;
use crate::schema::SchemaBootstrap;

/// Upload ceiling for note images. Larger payloads are rejected with a
/// descriptive error, never truncated.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const GENERIC_WRITE_ERROR: &str =
    "Something went wrong while saving the note. Please try again.";

/// An uploaded file part from the create-note form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// The create-note submission after multipart parsing. A non-file
/// `image` field leaves `image` unset.
#[derive(Debug, Clone, Default)]
pub struct CreateNoteForm {
    pub kind: Option<String>,
    pub content: Option<String>,
    pub caption: Option<String>,
    pub image: Option<UploadedImage>,
}

/// Outcome of a create-note submission, rendered as JSON form state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteActionState {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NoteActionState {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// The application behind the HTTP surface.
pub struct NotesApp {
    bindings: Bindings,
    schema: Arc<SchemaBootstrap>,
    strict_reads: bool,
}

impl NotesApp {
    /// Build the app on the process-wide schema memo.
    pub fn new(bindings: Bindings) -> Self {
        Self::with_schema(bindings, SchemaBootstrap::shared())
    }

    /// Build the app with an explicit schema memo. Tests use this to
    /// get a fresh memo per case.
    pub fn with_schema(bindings: Bindings, schema: Arc<SchemaBootstrap>) -> Self {
        Self {
            bindings,
            schema,
            strict_reads: false,
        }
    }

    /// Propagate listing failures instead of degrading to an empty
    /// page.
    pub fn strict_reads(mut self, strict: bool) -> Self {
        self.strict_reads = strict;
        self
    }

    /// Binding availability for the diagnostics endpoint.
    pub fn status(&self) -> BindingStatus {
        self.bindings.status()
    }

    fn repository(&self) -> Result<NoteRepository, NoteError> {
        Ok(NoteRepository::new(
            self.bindings.database()?,
            self.schema.clone(),
        ))
    }

    /// Handle a create-note submission.
    ///
    /// Validation errors and missing bindings surface their own
    /// message; backing-call failures are logged server-side and
    /// surfaced as a generic message.
    pub async fn create_note(&self, form: CreateNoteForm) -> NoteActionState {
        match self.try_create_note(form).await {
            Ok(()) => NoteActionState::ok(),
            Err(err @ (NoteError::BadRequest { .. } | NoteError::BindingUnavailable { .. })) => {
                NoteActionState::fail(err.message())
            }
            Err(err) => {
                log::error!("failed to create note: {err}");
                NoteActionState::fail(GENERIC_WRITE_ERROR)
            }
        }
    }

    async fn try_create_note(&self, form: CreateNoteForm) -> Result<(), NoteError> {
        let kind = form
            .kind
            .as_deref()
            .and_then(NoteKind::parse)
            .ok_or_else(|| NoteError::bad_request("Please choose a valid note type."))?;

        let id = generate_note_id();
        let created_at = timestamp_now();

        match kind {
            NoteKind::Text => {
                let content = form.content.as_deref().unwrap_or("").trim().to_string();
                if content.is_empty() {
                    return Err(NoteError::bad_request("Text notes cannot be empty."));
                }

                let repo = self.repository()?;
                let note = Note {
                    id,
                    kind,
                    content: Some(content),
                    image_key: None,
                    created_at,
                };
                repo.insert(&note).await?;
                Ok(())
            }
            NoteKind::Image => {
                let image = form
                    .image
                    .ok_or_else(|| NoteError::bad_request("Please attach an image to upload."))?;
                if image.bytes.is_empty() {
                    return Err(NoteError::bad_request(
                        "The selected image appears to be empty.",
                    ));
                }
                if image.bytes.len() > MAX_IMAGE_BYTES {
                    return Err(NoteError::bad_request(
                        "Images must be smaller than 5 MiB.",
                    ));
                }

                // Resolve both bindings before the first side effect.
                let blobs = self.bindings.images()?;
                let repo = self.repository()?;

                let content_type = if image.content_type.is_empty() {
                    "application/octet-stream".to_string()
                } else {
                    image.content_type
                };
                let filename = if image.filename.is_empty() {
                    "upload"
                } else {
                    image.filename.as_str()
                };
                let key = image_object_key(&created_at, &id, filename);

                // Blob first, row second. A failed insert can leave an
                // orphaned blob behind; there is no cross-store
                // transaction and no reconciliation sweep.
                blobs
                    .put_object(&key, image.bytes, &content_type)
                    .await?;

                let caption = form
                    .caption
                    .as_deref()
                    .map(str::trim)
                    .filter(|caption| !caption.is_empty())
                    .map(str::to_string);

                let note = Note {
                    id,
                    kind,
                    content: caption,
                    image_key: Some(key),
                    created_at,
                };
                repo.insert(&note).await?;
                Ok(())
            }
        }
    }

    /// List every note, newest first. By default failures (including a
    /// missing database binding) degrade to an empty listing so the
    /// page stays renderable; strict mode propagates them.
    pub async fn list_notes(&self) -> Result<Vec<Note>, NoteError> {
        let repo = match self.repository() {
            Ok(repo) => repo,
            Err(err) if !self.strict_reads => {
                log::warn!("serving empty note listing: {err}");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        if self.strict_reads {
            Ok(repo.list().await?)
        } else {
            Ok(repo.list_or_empty().await)
        }
    }

    /// Fetch an uploaded image for serving. An empty key is a request
    /// error; an absent object is not-found.
    pub async fn fetch_image(&self, key: &str) -> Result<BlobObject, NoteError> {
        if key.is_empty() {
            return Err(NoteError::bad_request("missing image key"));
        }
        let blobs = self.bindings.images()?;
        blobs
            .get_object(key)
            .await?
            .ok_or_else(|| NoteError::not_found(format!("image {key}")))
    }
}
