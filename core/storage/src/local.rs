//! Local filesystem storage provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::provider::{Metadata, StorageProvider};
use muxd_common::{Error, ProviderId, ResourcePath, Result};

/// Local filesystem storage provider.
///
/// Serves files below a root directory. `ResourcePath` already rejects
/// `..` components, so every resolved path stays inside the root.
pub struct LocalProvider {
    id: ProviderId,
    root: PathBuf,
}

impl LocalProvider {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Empty id
    /// - Root cannot be created
    pub fn new(id: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let id = ProviderId::new(id)?;
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self { id, root })
    }

    /// Root directory served by this provider.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a ResourcePath to a filesystem path.
    fn to_fs_path(&self, path: &ResourcePath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in path.components() {
            fs_path.push(component);
        }
        fs_path
    }

    /// Create metadata from filesystem metadata.
    fn create_metadata(&self, path: &ResourcePath, fs_meta: std::fs::Metadata) -> Metadata {
        let modified: DateTime<Utc> = fs_meta
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        Metadata {
            name: path.name().unwrap_or("/").to_string(),
            path: path.to_string_path(),
            size: if fs_meta.is_file() {
                Some(fs_meta.len())
            } else {
                None
            },
            is_directory: fs_meta.is_dir(),
            modified,
            etag: Some(format!("{}-{}", modified.timestamp(), fs_meta.len())),
        }
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn read(&self, path: &ResourcePath) -> Result<Vec<u8>> {
        let fs_path = self.to_fs_path(path);

        if !fs_path.exists() {
            return Err(Error::NotFound(format!("File not found: {}", path)));
        }

        if fs_path.is_dir() {
            return Err(Error::InvalidInput("Cannot read a directory".to_string()));
        }

        Ok(fs::read(&fs_path).await?)
    }

    async fn write(&self, path: &ResourcePath, data: Vec<u8>) -> Result<Metadata> {
        if path.is_root() {
            return Err(Error::InvalidInput("Cannot write to the storage root".to_string()));
        }
        let fs_path = self.to_fs_path(path);

        if let Some(parent) = fs_path.parent() {
            if !parent.is_dir() {
                return Err(Error::NotFound("Parent directory not found".to_string()));
            }
        }

        if fs_path.is_dir() {
            return Err(Error::InvalidInput(format!("{} is a directory", path)));
        }

        fs::write(&fs_path, &data).await?;

        let fs_meta = fs::metadata(&fs_path).await?;
        Ok(self.create_metadata(path, fs_meta))
    }

    async fn stat(&self, path: &ResourcePath) -> Result<Metadata> {
        let fs_path = self.to_fs_path(path);

        if !fs_path.exists() {
            return Err(Error::NotFound(format!("Path not found: {}", path)));
        }

        let fs_meta = fs::metadata(&fs_path).await?;
        Ok(self.create_metadata(path, fs_meta))
    }

    async fn delete(&self, path: &ResourcePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::InvalidInput("Cannot delete the storage root".to_string()));
        }
        let fs_path = self.to_fs_path(path);

        if !fs_path.exists() {
            return Err(Error::NotFound(format!("Path not found: {}", path)));
        }

        if fs_path.is_dir() {
            let mut entries = fs::read_dir(&fs_path).await?;
            if entries.next_entry().await?.is_some() {
                return Err(Error::InvalidInput("Directory not empty".to_string()));
            }
            fs::remove_dir(&fs_path).await?;
        } else {
            fs::remove_file(&fs_path).await?;
        }
        Ok(())
    }

    async fn list(&self, path: &ResourcePath) -> Result<Vec<Metadata>> {
        let fs_path = self.to_fs_path(path);

        if !fs_path.exists() {
            return Err(Error::NotFound(format!("Directory not found: {}", path)));
        }

        if !fs_path.is_dir() {
            return Err(Error::InvalidInput("Not a directory".to_string()));
        }

        let mut results = Vec::new();
        let mut entries = fs::read_dir(&fs_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                tracing::warn!(dir = %path, "skipping entry with non UTF-8 name");
                continue;
            };

            let child = path.join(&name)?;
            let fs_meta = entry.metadata().await?;
            results.push(self.create_metadata(&child, fs_meta));
        }

        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    async fn create_dir(&self, path: &ResourcePath) -> Result<Metadata> {
        let fs_path = self.to_fs_path(path);

        if fs_path.exists() {
            return Err(Error::AlreadyExists(format!(
                "Path already exists: {}",
                path
            )));
        }

        if let Some(parent) = fs_path.parent() {
            if !parent.is_dir() {
                return Err(Error::NotFound("Parent directory not found".to_string()));
            }
        }

        fs::create_dir(&fs_path).await?;

        let fs_meta = fs::metadata(&fs_path).await?;
        Ok(self.create_metadata(path, fs_meta))
    }
}
