//! Image replacement bookkeeping.
//!
//! Invariant: after a successful replace, the prior stored object is deleted
//! exactly once. The delete is fire-and-forget; the new upload is what the
//! caller's success depends on.

use bytes::Bytes;

use crate::errors::AppError;
use crate::models::submission::{ImageKind, ImageRef};
use crate::storage::{delete_quietly, ImageStore};

/// Uploads the replacement image, then deletes the prior object if one was
/// stored. A failed upload leaves the prior object untouched.
pub async fn replace_image(
    store: &dyn ImageStore,
    prior: Option<&ImageRef>,
    bytes: Bytes,
    content_type: &str,
    kind: ImageKind,
) -> Result<ImageRef, AppError> {
    let uploaded = store.upload(bytes, content_type, kind).await?;

    if let Some(prior) = prior {
        delete_quietly(store, &prior.storage_key).await;
    }

    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Test double that records every call and can be told to fail uploads.
    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        fail_uploads: bool,
    }

    #[async_trait]
    impl ImageStore for RecordingStore {
        async fn upload(
            &self,
            _bytes: Bytes,
            content_type: &str,
            kind: ImageKind,
        ) -> Result<ImageRef, AppError> {
            if self.fail_uploads {
                return Err(AppError::Storage("upload refused".to_string()));
            }
            let extension = crate::storage::extension_for_mime(content_type)
                .ok_or_else(|| AppError::Validation("bad mime".to_string()))?;
            let key = crate::storage::build_object_key(kind, extension);
            self.uploads.lock().unwrap().push(key.clone());
            Ok(ImageRef {
                url: format!("https://cdn.test/{key}"),
                storage_key: key,
            })
        }

        async fn delete(&self, storage_key: &str) -> Result<(), AppError> {
            self.deletes.lock().unwrap().push(storage_key.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_first_replace_deletes_nothing() {
        let store = RecordingStore::default();

        let image = replace_image(
            &store,
            None,
            Bytes::from_static(b"jpeg-bytes"),
            "image/jpeg",
            ImageKind::Profile,
        )
        .await
        .unwrap();

        assert_eq!(store.uploads.lock().unwrap().len(), 1);
        assert!(store.deletes.lock().unwrap().is_empty());
        assert!(image.storage_key.starts_with("borrowers/profile/"));
    }

    #[tokio::test]
    async fn test_each_replace_deletes_the_prior_key_once() {
        let store = RecordingStore::default();

        let first = replace_image(
            &store,
            None,
            Bytes::from_static(b"v1"),
            "image/jpeg",
            ImageKind::Profile,
        )
        .await
        .unwrap();

        let second = replace_image(
            &store,
            Some(&first),
            Bytes::from_static(b"v2"),
            "image/jpeg",
            ImageKind::Profile,
        )
        .await
        .unwrap();

        let _third = replace_image(
            &store,
            Some(&second),
            Bytes::from_static(b"v3"),
            "image/jpeg",
            ImageKind::Profile,
        )
        .await
        .unwrap();

        let deletes = store.deletes.lock().unwrap();
        assert_eq!(*deletes, vec![first.storage_key, second.storage_key]);
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_the_prior_object() {
        let store = RecordingStore {
            fail_uploads: true,
            ..Default::default()
        };
        let prior = ImageRef {
            url: "https://cdn.test/borrowers/profile/old.jpg".to_string(),
            storage_key: "borrowers/profile/old.jpg".to_string(),
        };

        let result = replace_image(
            &store,
            Some(&prior),
            Bytes::from_static(b"v2"),
            "image/jpeg",
            ImageKind::Profile,
        )
        .await;

        assert!(result.is_err());
        assert!(store.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_mime_is_rejected_before_any_call() {
        let store = RecordingStore::default();

        let result = replace_image(
            &store,
            None,
            Bytes::from_static(b"<svg/>"),
            "image/svg+xml",
            ImageKind::Profile,
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.deletes.lock().unwrap().is_empty());
    }
}
