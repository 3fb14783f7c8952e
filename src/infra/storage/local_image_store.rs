use crate::domain::ports::ImageStore;
use crate::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

/// URL prefix under which the upload directory is served.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Stores event images on local disk under random file names.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, extension: &str, data: &[u8]) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            error!("Failed to create upload dir {:?}: {}", self.root, e);
            AppError::InternalWithMsg(format!("Upload dir error: {}", e))
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, data).await.map_err(|e| {
            error!("Failed to write image {:?}: {}", path, e);
            AppError::InternalWithMsg(format!("Image write error: {}", e))
        })?;

        info!(file = %file_name, bytes = data.len(), "Stored event image");
        Ok(format!("{}{}", UPLOADS_PREFIX, file_name))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let Some(file_name) = url.strip_prefix(UPLOADS_PREFIX) else {
            return Ok(());
        };
        // Only plain file names; anything with a separator is not ours.
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.contains("..") {
            warn!(url, "Refusing to delete image outside upload dir");
            return Ok(());
        }

        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to delete image {}: {}", file_name, e);
                Err(AppError::InternalWithMsg(format!("Image delete error: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_delete_roundtrip_on_disk() {
        let dir = std::env::temp_dir().join(format!("eventhub-img-{}", Uuid::new_v4()));
        let store = LocalImageStore::new(&dir);

        let url = store.save("png", b"fake").await.unwrap();
        assert!(url.starts_with(UPLOADS_PREFIX));
        let path = dir.join(url.trim_start_matches(UPLOADS_PREFIX));
        assert!(path.exists());

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn delete_ignores_foreign_paths() {
        let store = LocalImageStore::new(std::env::temp_dir());
        store.delete("/uploads/../etc/passwd").await.unwrap();
        store.delete("https://cdn.example.com/a.png").await.unwrap();
    }
}
