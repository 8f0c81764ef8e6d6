//! Provider-neutral blob store abstraction for uploaded note images.
//!
//! Keys are path-like strings under the `notes/` prefix. Writes
//! overwrite unconditionally — there is no existence check and no
//! optimistic concurrency, matching the object-store semantics of the
//! backing services.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::error::NoteError;

/// Prefix for every uploaded note image.
pub const IMAGE_KEY_PREFIX: &str = "notes/";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors returned by blob store operations. An absent key is not an
/// error: `get_object` signals it with `Ok(None)`.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The blob store binding is missing from the hosting context.
    #[error("blob store binding {binding} is not configured")]
    Unavailable { binding: &'static str },

    /// A general internal error.
    #[error("blob store error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<BlobError> for NoteError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::Unavailable { binding } => NoteError::binding_unavailable(binding),
            other => NoteError::internal(anyhow::Error::new(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A fetched object: bytes plus the metadata the image route serves.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobObject {
    pub bytes: Bytes,
    pub content_type: String,
    /// Entity tag when the backing store provides one.
    pub etag: Option<String>,
}

/// Object-safe interface for blob store backends.
///
/// Implementations exist per adapter:
/// - `R2Store` (cloudflare adapter): Cloudflare R2
/// - `MemoryBlobStore` (axum adapter): local dev / tests
#[async_trait(?Send)]
pub trait BlobStore {
    /// Upload bytes under `key` with the given content type,
    /// overwriting any existing object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BlobError>;

    /// Fetch an object by key. Returns `Ok(None)` if the key is absent.
    async fn get_object(&self, key: &str) -> Result<Option<BlobObject>, BlobError>;
}

// ---------------------------------------------------------------------------
// Key construction
// ---------------------------------------------------------------------------

/// Replace every character outside `[A-Za-z0-9.\-_]` with `_`, keeping
/// uploaded filenames path-safe inside the object key.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the object key for an uploaded image:
/// `notes/<timestamp>-<id>-<sanitized filename>`, with `:` and `.` in
/// the timestamp flattened to `-` so the key stays path-safe.
pub fn image_object_key(created_at: &str, id: &str, filename: &str) -> String {
    let stamp = created_at.replace([':', '.'], "-");
    format!("{IMAGE_KEY_PREFIX}{stamp}-{id}-{}", sanitize_filename(filename))
}

// ---------------------------------------------------------------------------
// Contract test macro
// ---------------------------------------------------------------------------

/// Generate a suite of contract tests for any [`BlobStore`]
/// implementation. Takes a module name and a factory expression that
/// produces a fresh store.
///
/// ```rust,ignore
/// edgenotes_core::blob_contract_tests!(memory_blob_contract, MemoryBlobStore::new());
/// ```
#[macro_export]
macro_rules! blob_contract_tests {
    ($mod_name:ident, $factory:expr) => {
        mod $mod_name {
            use super::*;
            use bytes::Bytes;
            use $crate::blob::BlobStore;

            fn run<F: std::future::Future>(f: F) -> F::Output {
                futures::executor::block_on(f)
            }

            #[test]
            fn contract_put_and_get() {
                let store = $factory;
                run(async {
                    store
                        .put_object("notes/a.png", Bytes::from("img"), "image/png")
                        .await
                        .unwrap();
                    let obj = store.get_object("notes/a.png").await.unwrap().unwrap();
                    assert_eq!(obj.bytes, Bytes::from("img"));
                    assert_eq!(obj.content_type, "image/png");
                });
            }

            #[test]
            fn contract_get_missing_returns_none() {
                let store = $factory;
                run(async {
                    assert!(store.get_object("notes/missing").await.unwrap().is_none());
                });
            }

            #[test]
            fn contract_put_overwrites() {
                let store = $factory;
                run(async {
                    store
                        .put_object("k", Bytes::from("first"), "image/png")
                        .await
                        .unwrap();
                    store
                        .put_object("k", Bytes::from("second"), "image/jpeg")
                        .await
                        .unwrap();
                    let obj = store.get_object("k").await.unwrap().unwrap();
                    assert_eq!(obj.bytes, Bytes::from("second"));
                    assert_eq!(obj.content_type, "image/jpeg");
                });
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
