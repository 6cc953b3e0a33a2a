use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::fs;
use uuid::Uuid;

use crate::{error::AppError, models::media::MediaType};

const UPLOADS_DIR: &str = "uploads";

/// Owns the media root directory. Upload keys have the shape
/// `uploads/<media-type>/<uuid>`; anything else is rejected before it can
/// touch the filesystem.
#[derive(Clone)]
pub struct MediaStore {
    root: Arc<PathBuf>,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        for media_type in [MediaType::Image, MediaType::Video, MediaType::Audio] {
            let dir = self.root().join(UPLOADS_DIR).join(media_type.as_str());
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    /// Issue a fresh storage key for an upload slot.
    pub fn issue_key(&self, media_type: MediaType) -> String {
        format!("{UPLOADS_DIR}/{}/{}", media_type.as_str(), Uuid::new_v4())
    }

    /// Persist uploaded bytes under a previously issued key.
    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, bytes).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Map a storage key back to its path, refusing anything that does not
    /// match the issued-key shape.
    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let mut parts = key.split('/');
        let (prefix, media_type, name) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(media_type), Some(name), None) => (prefix, media_type, name),
            _ => return Err(AppError::BadRequest(format!("invalid storage key {key:?}"))),
        };
        if prefix != UPLOADS_DIR
            || !matches!(media_type, "image" | "video" | "audio")
            || Uuid::parse_str(name).is_err()
        {
            return Err(AppError::BadRequest(format!("invalid storage key {key:?}")));
        }
        Ok(self.root().join(prefix).join(media_type).join(name))
    }
}
