// Blob storage for uploaded event images

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Opaque store for binary payloads addressed by relative paths
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `bytes` under `directory`, returning the relative locator
    async fn save(&self, directory: &str, original_name: &str, bytes: &[u8]) -> ServiceResult<String>;

    async fn delete(&self, locator: &str) -> ServiceResult<()>;
}

/// Local filesystem implementation rooted at a base directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, locator: &str) -> ServiceResult<PathBuf> {
        let relative = Path::new(locator);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe || locator.is_empty() {
            return Err(ServiceError::file_system(format!(
                "Invalid storage path '{}'",
                locator
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

/// Unique file name keeping a sanitized extension of the upload
pub fn unique_file_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());

    match extension {
        Some(extension) => format!("{}.{}", Uuid::new_v4(), extension),
        None => Uuid::new_v4().to_string(),
    }
}

#[async_trait]
impl BlobStore for LocalFileStorage {
    async fn save(&self, directory: &str, original_name: &str, bytes: &[u8]) -> ServiceResult<String> {
        let locator = format!("{}/{}", directory.trim_matches('/'), unique_file_name(original_name));
        let file_path = self.resolve(&locator)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create directory {}: {}", parent.display(), e);
                ServiceError::file_system("Failed to store file")
            })?;
        }

        fs::write(&file_path, bytes).await.map_err(|e| {
            error!("Failed to write {}: {}", file_path.display(), e);
            ServiceError::file_system("Failed to store file")
        })?;

        info!(path = %file_path.display(), size = bytes.len(), "Stored blob");
        Ok(locator)
    }

    async fn delete(&self, locator: &str) -> ServiceResult<()> {
        let file_path = self.resolve(locator)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => {
                info!(path = %file_path.display(), "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to delete {}: {}", file_path.display(), e);
                Err(ServiceError::file_system("Failed to delete file"))
            }
        }
    }
}
