//! Local-directory image store
//!
//! Files are named by a fresh UUID so concurrent submissions never collide.
//! The returned value is the public URL path, which is what gets persisted in
//! `issue_reports.segmented_image`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Encoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct ImageStore {
    root: PathBuf,
    public_prefix: String,
}

impl ImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.image_dir.clone(),
            public_prefix: config.public_prefix.clone(),
        }
    }

    /// Create the image directory if it does not exist yet
    pub async fn ensure_dir_exists(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io {
                path: self.root.display().to_string(),
                source,
            })?;
        info!("Image store ready at {}", self.root.display());
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Encode `image` as PNG and write it, returning its public path.
    ///
    /// Encoding is CPU-bound and runs on the blocking pool.
    pub async fn put_png(&self, image: RgbImage) -> Result<String, StorageError> {
        let buf = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, StorageError> {
            let mut buf = Vec::new();
            image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            Ok(buf)
        })
        .await??;

        let file_name = format!("{}.png", Uuid::new_v4());
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, &buf)
            .await
            .map_err(|source| StorageError::Io {
                path: path.display().to_string(),
                source,
            })?;

        debug!("Stored annotated image {} ({} bytes)", file_name, buf.len());
        Ok(self.public_url(&file_name))
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }

    /// Delete a file previously returned by `put_png`.
    ///
    /// Best effort: failures are logged, paths outside the store are ignored.
    pub async fn remove(&self, public_path: &str) {
        let Some(file_name) = public_path
            .strip_prefix(self.public_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            warn!("Refusing to remove {}: not an image store path", public_path);
            return;
        };

        let path = self.root.join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed annotated image {}", file_name),
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tokio_test::{assert_err, assert_ok};

    fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("image-store-{}", Uuid::new_v4()));
        ImageStore::new(&StorageConfig {
            image_dir: dir,
            public_prefix: "/static/segmented".to_string(),
        })
    }

    #[tokio::test]
    async fn test_put_png_writes_file_and_returns_public_path() {
        let store = temp_store();
        assert_ok!(store.ensure_dir_exists().await);

        let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let url = assert_ok!(store.put_png(image).await);

        assert!(url.starts_with("/static/segmented/"));
        assert!(url.ends_with(".png"));

        let file_name = url.rsplit('/').next().unwrap();
        let written = image::open(store.root().join(file_name)).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (4, 3));
        assert_eq!(written.get_pixel(0, 0), &Rgb([10, 20, 30]));

        std::fs::remove_dir_all(store.root()).unwrap();
    }

    #[tokio::test]
    async fn test_put_png_fails_without_directory() {
        let store = temp_store();
        let image = RgbImage::new(1, 1);
        let err = assert_err!(store.put_png(image).await);
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file() {
        let store = temp_store();
        assert_ok!(store.ensure_dir_exists().await);

        let url = assert_ok!(store.put_png(RgbImage::new(2, 2)).await);
        let file_name = url.rsplit('/').next().unwrap().to_string();
        assert!(store.root().join(&file_name).exists());

        store.remove(&url).await;
        assert!(!store.root().join(&file_name).exists());

        // Already gone, and foreign paths, are only logged
        store.remove(&url).await;
        store.remove("/elsewhere/x.png").await;
        store.remove("/static/segmented/../secret").await;

        std::fs::remove_dir_all(store.root()).unwrap();
    }
}
