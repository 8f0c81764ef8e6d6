//! Cloudflare R2 implementation of the core blob-store trait.

use async_trait::async_trait;
use bytes::Bytes;
use worker::{Bucket, Env, HttpMetadata};

use edgenotes_core::bindings::IMAGES_BINDING;
use edgenotes_core::blob::{BlobError, BlobObject, BlobStore};

/// The `NOTE_IMAGES` R2 bucket wrapped behind [`BlobStore`].
pub struct R2Store {
    bucket: Bucket,
}

impl R2Store {
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket }
    }

    /// The `NOTE_IMAGES` binding, or `None` when the deployment has none.
    pub fn from_env(env: &Env) -> Option<Self> {
        env.bucket(IMAGES_BINDING).ok().map(Self::new)
    }
}

fn internal(err: worker::Error) -> BlobError {
    BlobError::Internal(anyhow::anyhow!(err.to_string()))
}

#[async_trait(?Send)]
impl BlobStore for R2Store {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.bucket
            .put(key, bytes.to_vec())
            .http_metadata(HttpMetadata {
                content_type: Some(content_type.to_string()),
                ..HttpMetadata::default()
            })
            .execute()
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<BlobObject>, BlobError> {
        let object = match self.bucket.get(key).execute().await.map_err(internal)? {
            Some(object) => object,
            None => return Ok(None),
        };

        let body = object
            .body()
            .ok_or_else(|| BlobError::Internal(anyhow::anyhow!("object {key} has no body")))?;
        let bytes = body.bytes().await.map_err(internal)?;
        let content_type = object
            .http_metadata()
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Some(BlobObject {
            bytes: Bytes::from(bytes),
            content_type,
            etag: Some(object.http_etag()),
        }))
    }
}
