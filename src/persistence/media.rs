//! Local-disk storage for editor image uploads.
//!
//! Files land in `{MEDIA_DIR}/{project_id}/{uuid}.{ext}` and are served
//! by `tower_http::services::ServeDir` under `MEDIA_URL_PREFIX`.

use std::path::PathBuf;

use tokio::fs;

use crate::config::AppConfig;
use crate::domain::ProjectId;
use crate::error::AppError;

/// Accepted image types and their file extensions.
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Public URL path.
    pub url: String,
    /// Size in bytes.
    pub size: usize,
    /// MIME type.
    pub content_type: String,
}

/// Writes uploads below a root directory.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl MediaStorage {
    /// Creates a storage rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf, url_prefix: &str, max_bytes: usize) -> Self {
        Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    /// Storage configured from `MEDIA_*` settings.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.media_dir.clone(),
            &config.media_url_prefix,
            config.media_max_bytes,
        )
    }

    /// Root directory.
    #[must_use]
    pub const fn root(&self) -> &PathBuf {
        &self.root
    }

    /// URL prefix files are served under.
    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Maximum accepted upload size.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Creates the root directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the directory cannot be created.
    pub async fn init(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create media directory: {e}")))
    }

    /// Stores an image for a project and returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] on `file` for empty, oversized or
    /// non-image uploads, and [`AppError::Internal`] on I/O failure.
    pub async fn store_image(
        &self,
        project_id: ProjectId,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredMedia, AppError> {
        let Some((_, ext)) = IMAGE_TYPES.iter().find(|(mime, _)| *mime == content_type) else {
            return Err(AppError::validation(
                "file",
                format!("unsupported image type '{content_type}'"),
            ));
        };
        if bytes.is_empty() {
            return Err(AppError::validation("file", "file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::validation(
                "file",
                format!("file exceeds {} bytes", self.max_bytes),
            ));
        }

        let dir = self.root.join(project_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create media directory: {e}")))?;

        let file_name = format!("{}.{ext}", uuid::Uuid::new_v4());
        fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to write media file: {e}")))?;

        tracing::debug!(%project_id, file = %file_name, size = bytes.len(), "image stored");
        Ok(StoredMedia {
            url: format!("{}/{project_id}/{file_name}", self.url_prefix),
            size: bytes.len(),
            content_type: content_type.to_string(),
        })
    }
}
