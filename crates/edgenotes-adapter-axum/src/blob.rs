//! In-memory blob store for local development and testing.
//!
//! Objects live in a `BTreeMap` behind a `std::sync::Mutex`; uploads
//! do not survive a dev-server restart. An entity tag is derived from
//! the stored bytes so the image route can serve an `ETag` header.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use edgenotes_core::blob::{BlobError, BlobObject, BlobStore};

struct StoredObject {
    bytes: Bytes,
    content_type: String,
    etag: String,
}

/// A blob store backed by `BTreeMap<String, StoredObject>`.
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock_objects(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>, BlobError> {
        self.objects
            .lock()
            .map_err(|_| BlobError::Internal(anyhow::anyhow!("blob store lock poisoned")))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_etag(bytes: &[u8]) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

#[async_trait(?Send)]
impl BlobStore for MemoryBlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BlobError> {
        let etag = compute_etag(&bytes);
        let mut objects = self.lock_objects()?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                etag,
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<BlobObject>, BlobError> {
        let objects = self.lock_objects()?;
        Ok(objects.get(key).map(|stored| BlobObject {
            bytes: stored.bytes.clone(),
            content_type: stored.content_type.clone(),
            etag: Some(stored.etag.clone()),
        }))
    }
}
