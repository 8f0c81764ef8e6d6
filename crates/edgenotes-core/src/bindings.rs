//! Explicit handles to the two backing services.
//!
//! The hosting context injects a database and a blob store; either may
//! be absent on a fresh deployment. Absence is a detectable state, not
//! a crash: the diagnostics endpoint reports it and requests that need
//! the missing binding fail with a distinct configuration error.

use std::sync::Arc;

use serde::Serialize;

use crate::blob::BlobStore;
use crate::db::Database;
use crate::error::NoteError;

/// Binding name of the relational database in the hosting context.
pub const DB_BINDING: &str = "DB";

/// Binding name of the image bucket in the hosting context.
pub const IMAGES_BINDING: &str = "NOTE_IMAGES";

/// Resolved service handles for one process (or one request, on
/// platforms that hand bindings to each invocation).
#[derive(Clone, Default)]
pub struct Bindings {
    pub database: Option<Arc<dyn Database>>,
    pub images: Option<Arc<dyn BlobStore>>,
}

impl Bindings {
    pub fn new(
        database: Option<Arc<dyn Database>>,
        images: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        Self { database, images }
    }

    /// Availability snapshot for the diagnostics endpoint.
    pub fn status(&self) -> BindingStatus {
        BindingStatus {
            database: self.database.is_some(),
            images: self.images.is_some(),
        }
    }

    /// The database handle, or a configuration error naming the binding.
    pub fn database(&self) -> Result<Arc<dyn Database>, NoteError> {
        self.database
            .clone()
            .ok_or(NoteError::binding_unavailable(DB_BINDING))
    }

    /// The blob store handle, or a configuration error naming the binding.
    pub fn images(&self) -> Result<Arc<dyn BlobStore>, NoteError> {
        self.images
            .clone()
            .ok_or(NoteError::binding_unavailable(IMAGES_BINDING))
    }
}

/// Which bindings the hosting context supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BindingStatus {
    pub database: bool,
    pub images: bool,
}
