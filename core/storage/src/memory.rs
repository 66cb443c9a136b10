//! In-memory storage provider for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::provider::{Metadata, StorageProvider};
use muxd_common::{Error, ProviderId, ResourcePath, Result};

/// In-memory storage entry.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, metadata: Metadata },
    Directory { metadata: Metadata },
}

impl Entry {
    fn metadata(&self) -> &Metadata {
        match self {
            Entry::File { metadata, .. } | Entry::Directory { metadata } => metadata,
        }
    }
}

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Entries are keyed by their string path so a
/// `BTreeMap` range walk yields directory children in name order.
pub struct MemoryProvider {
    id: ProviderId,
    storage: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = ProviderId::new(id)?;
        let mut storage = BTreeMap::new();
        storage.insert(
            "/".to_string(),
            Entry::Directory {
                metadata: Self::directory_metadata(&ResourcePath::root()),
            },
        );

        Ok(Self {
            id,
            storage: RwLock::new(storage),
        })
    }

    fn path_to_key(path: &ResourcePath) -> String {
        path.to_string_path()
    }

    fn directory_metadata(path: &ResourcePath) -> Metadata {
        Metadata {
            name: path.name().unwrap_or("/").to_string(),
            path: path.to_string_path(),
            size: None,
            is_directory: true,
            modified: Utc::now(),
            etag: Some(Uuid::new_v4().to_string()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.storage
            .read()
            .map_err(|_| Error::Storage("memory storage lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.storage
            .write()
            .map_err(|_| Error::Storage("memory storage lock poisoned".to_string()))
    }

    fn check_parent(storage: &BTreeMap<String, Entry>, path: &ResourcePath) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        match storage.get(&Self::path_to_key(&parent)) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(Error::InvalidInput("Parent is a file".to_string())),
            None => Err(Error::NotFound("Parent directory not found".to_string())),
        }
    }

    fn children<'a>(storage: &'a BTreeMap<String, Entry>, path: &ResourcePath) -> Vec<&'a Entry> {
        let prefix = if path.is_root() {
            "/".to_string()
        } else {
            format!("{}/", Self::path_to_key(path))
        };
        storage
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| {
                let relative = &key[prefix.len()..];
                !relative.is_empty() && !relative.contains('/')
            })
            .map(|(_, entry)| entry)
            .collect()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn read(&self, path: &ResourcePath) -> Result<Vec<u8>> {
        let storage = self.read_lock()?;

        match storage.get(&Self::path_to_key(path)) {
            Some(Entry::File { data, .. }) => Ok(data.clone()),
            Some(Entry::Directory { .. }) => {
                Err(Error::InvalidInput("Cannot read a directory".to_string()))
            }
            None => Err(Error::NotFound(format!("File not found: {}", path))),
        }
    }

    async fn write(&self, path: &ResourcePath, data: Vec<u8>) -> Result<Metadata> {
        if path.is_root() {
            return Err(Error::InvalidInput("Cannot write to the storage root".to_string()));
        }
        let key = Self::path_to_key(path);
        let mut storage = self.write_lock()?;

        Self::check_parent(&storage, path)?;
        if let Some(Entry::Directory { .. }) = storage.get(&key) {
            return Err(Error::InvalidInput(format!("{} is a directory", path)));
        }

        let metadata = Metadata {
            name: path.name().unwrap_or("/").to_string(),
            path: path.to_string_path(),
            size: Some(data.len() as u64),
            is_directory: false,
            modified: Utc::now(),
            etag: Some(Uuid::new_v4().to_string()),
        };

        storage.insert(
            key,
            Entry::File {
                data,
                metadata: metadata.clone(),
            },
        );

        Ok(metadata)
    }

    async fn stat(&self, path: &ResourcePath) -> Result<Metadata> {
        let storage = self.read_lock()?;

        storage
            .get(&Self::path_to_key(path))
            .map(|entry| entry.metadata().clone())
            .ok_or_else(|| Error::NotFound(format!("Path not found: {}", path)))
    }

    async fn delete(&self, path: &ResourcePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::InvalidInput("Cannot delete the storage root".to_string()));
        }
        let key = Self::path_to_key(path);
        let mut storage = self.write_lock()?;

        match storage.get(&key) {
            Some(Entry::File { .. }) => {}
            Some(Entry::Directory { .. }) => {
                if !Self::children(&storage, path).is_empty() {
                    return Err(Error::InvalidInput("Directory not empty".to_string()));
                }
            }
            None => return Err(Error::NotFound(format!("Path not found: {}", path))),
        }

        storage.remove(&key);
        Ok(())
    }

    async fn list(&self, path: &ResourcePath) -> Result<Vec<Metadata>> {
        let storage = self.read_lock()?;

        match storage.get(&Self::path_to_key(path)) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(Error::InvalidInput("Not a directory".to_string()));
            }
            None => {
                return Err(Error::NotFound(format!("Directory not found: {}", path)));
            }
        }

        Ok(Self::children(&storage, path)
            .into_iter()
            .map(|entry| entry.metadata().clone())
            .collect())
    }

    async fn create_dir(&self, path: &ResourcePath) -> Result<Metadata> {
        let key = Self::path_to_key(path);
        let mut storage = self.write_lock()?;

        if storage.contains_key(&key) {
            return Err(Error::AlreadyExists(format!(
                "Path already exists: {}",
                path
            )));
        }
        Self::check_parent(&storage, path)?;

        let metadata = Self::directory_metadata(path);
        storage.insert(
            key,
            Entry::Directory {
                metadata: metadata.clone(),
            },
        );

        Ok(metadata)
    }
}
