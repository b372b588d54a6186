//! Image storage adapter.
//!
//! Uploads go to S3 (or MinIO locally) under a fixed folder namespace per image
//! kind. Only the normalized object key and public URL are ever persisted.
//! Deletion is fire-and-forget: failures are logged and swallowed, so orphaned
//! remote objects are an accepted risk.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::submission::{ImageKind, ImageRef};

/// MIME types accepted for borrower photos and signatures.
const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Maps an accepted MIME type to the file extension used in object keys.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Builds the object key for a new upload: `<kind folder>/<uuid>.<ext>`.
pub fn build_object_key(kind: ImageKind, extension: &str) -> String {
    format!("{}/{}.{}", kind.folder(), Uuid::new_v4(), extension)
}

/// Abstraction over the cloud image host. Production uses S3; tests substitute
/// a recording implementation.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, AppError>;

    async fn delete(&self, storage_key: &str) -> Result<(), AppError>;
}

/// Deletes a stored object without surfacing errors to the caller.
pub async fn delete_quietly(store: &dyn ImageStore, storage_key: &str) {
    if let Err(e) = store.delete(storage_key).await {
        warn!("Failed to delete stored image {storage_key}: {e}");
    }
}

pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: String,
}

impl S3ImageStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, AppError> {
        let extension = extension_for_mime(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {content_type}"))
        })?;
        let key = build_object_key(kind, extension);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded image to s3://{}/{}", self.bucket, key);

        Ok(ImageRef {
            url: format!("{}/{}", self.public_url, key),
            storage_key: key,
        })
    }

    async fn delete(&self, storage_key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;

        info!("Deleted image s3://{}/{}", self.bucket, storage_key);
        Ok(())
    }
}
