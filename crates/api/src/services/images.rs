//! Local image store for listing photos.
//!
//! Photos are written under the configured upload directory with a random
//! `public_id` and served by `ServeDir` at [`UPLOADS_PATH`].

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::models::CarImage;

/// URL prefix the upload directory is served under.
pub const UPLOADS_PATH: &str = "/uploads";

/// Largest accepted photo.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Errors from the image store.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// Content type is not an accepted image format.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// The upload had no bytes.
    #[error("image is empty")]
    Empty,

    /// The upload exceeded [`MAX_IMAGE_BYTES`].
    #[error("image exceeds {MAX_IMAGE_BYTES} bytes")]
    TooLarge,

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// File extension for an accepted image content type.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Writes photos to disk.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Store photos under `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory photos are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and persist a photo.
    ///
    /// # Errors
    ///
    /// Returns `ImageStoreError::UnsupportedType`, `Empty` or `TooLarge` for
    /// unacceptable uploads and `Io` if the file cannot be written.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn save(&self, bytes: &[u8], content_type: &str) -> Result<CarImage, ImageStoreError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| ImageStoreError::UnsupportedType(content_type.to_owned()))?;
        if bytes.is_empty() {
            return Err(ImageStoreError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageStoreError::TooLarge);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let public_id = format!("{}.{extension}", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&public_id), bytes).await?;

        Ok(CarImage {
            url: format!("{UPLOADS_PATH}/{public_id}"),
            public_id,
        })
    }

    /// Remove a stored photo. Missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ImageStoreError::Io` for filesystem errors other than
    /// not-found.
    pub async fn remove(&self, public_id: &str) -> Result<(), ImageStoreError> {
        // public_ids are generated here; anything with a separator is not ours.
        if public_id.contains(['/', '\\']) || public_id.starts_with('.') {
            return Ok(());
        }
        match tokio::fs::remove_file(self.dir.join(public_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> ImageStore {
        ImageStore::new(std::env::temp_dir().join(format!("carmart-images-{}", Uuid::new_v4())))
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("image/gif"), None);
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let store = temp_store();
        let image = store.save(b"\x89PNG fake", "image/png").await.unwrap();

        assert!(image.public_id.ends_with(".png"));
        assert_eq!(image.url, format!("/uploads/{}", image.public_id));
        let on_disk = tokio::fs::read(store.dir().join(&image.public_id)).await.unwrap();
        assert_eq!(on_disk, b"\x89PNG fake");

        store.remove(&image.public_id).await.unwrap();
        assert!(!store.dir().join(&image.public_id).exists());
        store.remove(&image.public_id).await.unwrap();

        tokio::fs::remove_dir_all(store.dir()).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejects_bad_uploads() {
        let store = temp_store();
        assert!(matches!(
            store.save(b"GIF89a", "image/gif").await,
            Err(ImageStoreError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.save(b"", "image/jpeg").await,
            Err(ImageStoreError::Empty)
        ));
        assert!(!store.dir().exists());
    }
}
