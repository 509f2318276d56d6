use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

/// Maps an allow-listed image content type to its file extension.
/// Anything else is not an image as far as the store is concerned.
pub fn ext_for_image(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        _ => None,
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write an accepted upload to durable storage and return the stable
    /// reference a product record can carry.
    async fn store(
        &self,
        body: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> Result<String, AppError>;

    /// Remove a stored file. A file that is already gone counts as removed.
    async fn delete(&self, reference: &str) -> Result<(), AppError>;
}

/// Flat directory of uploaded images on the local filesystem.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        self.root.join(reference)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(
        &self,
        body: Bytes,
        original_name: &str,
        content_type: &str,
    ) -> Result<String, AppError> {
        let ext = ext_for_image(content_type)
            .ok_or_else(|| AppError::Validation("Attached file is not an image.".into()))?;
        let reference = format!("{}-{}.{}", Uuid::new_v4(), file_stem(original_name), ext);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.resolve(&reference), &body).await?;
        debug!(%reference, bytes = body.len(), "image stored");
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), AppError> {
        match tokio::fs::remove_file(self.resolve(reference)).await {
            Ok(()) => {
                debug!(%reference, "image deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the client's file name readable in the stored reference without
/// letting path separators or oddball characters through.
fn file_stem(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(40)
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalImageStore {
        LocalImageStore::new(std::env::temp_dir().join(format!("bazaar-test-{}", Uuid::new_v4())))
    }

    #[test]
    fn ext_for_image_allows_only_png_and_jpeg() {
        assert_eq!(ext_for_image("image/png"), Some("png"));
        assert_eq!(ext_for_image("image/jpeg"), Some("jpg"));
        assert_eq!(ext_for_image("image/jpg"), Some("jpg"));
        assert_eq!(ext_for_image("image/webp"), None);
        assert_eq!(ext_for_image("application/pdf"), None);
        assert_eq!(ext_for_image("application/octet-stream"), None);
    }

    #[test]
    fn file_stem_strips_paths_and_odd_characters() {
        assert_eq!(file_stem("photo.png"), "photo");
        assert_eq!(file_stem("../../etc/passwd"), "passwd");
        assert_eq!(file_stem("my photo (1).jpg"), "myphoto1");
        assert_eq!(file_stem("...."), "upload");
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_reference() {
        let store = temp_store();
        let reference = store
            .store(Bytes::from_static(b"png-bytes"), "cap.png", "image/png")
            .await
            .expect("store should succeed");
        assert!(reference.ends_with("-cap.png"));

        let on_disk = tokio::fs::read(store.resolve(&reference)).await.unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn store_rejects_disallowed_content_type() {
        let store = temp_store();
        let err = store
            .store(Bytes::from_static(b"<svg/>"), "img.svg", "image/svg+xml")
            .await
            .unwrap_err();
        match err {
            AppError::Validation(msg) => assert_eq!(msg, "Attached file is not an image."),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = temp_store();
        let reference = store
            .store(Bytes::from_static(b"x"), "a.jpg", "image/jpeg")
            .await
            .unwrap();

        store.delete(&reference).await.expect("first delete");
        assert!(!store.resolve(&reference).exists());
        store.delete(&reference).await.expect("second delete is a no-op");
        store.delete("never-existed.png").await.expect("absent file is fine");
    }

    #[tokio::test]
    async fn stored_references_do_not_collide() {
        let store = temp_store();
        let a = store
            .store(Bytes::from_static(b"1"), "same.png", "image/png")
            .await
            .unwrap();
        let b = store
            .store(Bytes::from_static(b"2"), "same.png", "image/png")
            .await
            .unwrap();
        assert_ne!(a, b);
    }
}
