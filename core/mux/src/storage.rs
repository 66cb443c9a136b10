//! Storage multiplexer.

use std::sync::Arc;

use crate::registry::Registry;
use muxd_common::{Error, ProviderId, ResourcePath, Result};
use muxd_storage::{Metadata, StorageProvider};

/// Routes storage operations to the provider named by the caller.
///
/// Every operation is forwarded verbatim. There is no caching, retrying
/// or pooling here; provider errors come back unchanged.
#[derive(Debug)]
pub struct StorageMux {
    registry: Registry<dyn StorageProvider>,
}

impl StorageMux {
    pub fn new() -> Self {
        Self {
            registry: Registry::new("storage"),
        }
    }

    /// Register a provider under its own id.
    ///
    /// # Errors
    /// - `DuplicateProvider` if the id is taken
    pub fn register_storage_provider(&mut self, provider: Arc<dyn StorageProvider>) -> Result<()> {
        let id = provider.id().clone();
        self.registry.register(id, provider)
    }

    /// Resolve a provider by id.
    pub fn provider(&self, storage_id: &str) -> Result<Arc<dyn StorageProvider>> {
        self.registry.get(storage_id)
    }

    /// Registered storage ids, in no particular order.
    pub fn storages(&self) -> impl Iterator<Item = &ProviderId> + '_ {
        self.registry.list()
    }

    /// Split a resource path into its mount point and the path inside it.
    ///
    /// The mount point is not checked against the registry; the storage
    /// operation that follows reports an unknown mount.
    ///
    /// # Errors
    /// - `InvalidInput` for the root path, which has no mount point
    pub fn resolve_mount(&self, path: &ResourcePath) -> Result<(String, ResourcePath)> {
        path.split_mount()
            .map(|(mount, inner)| (mount.to_string(), inner))
            .ok_or_else(|| Error::InvalidInput("Path has no storage mount point".to_string()))
    }

    pub async fn read(&self, storage_id: &str, path: &ResourcePath) -> Result<Vec<u8>> {
        self.provider(storage_id)?.read(path).await
    }

    pub async fn write(&self, storage_id: &str, path: &ResourcePath, data: Vec<u8>) -> Result<Metadata> {
        self.provider(storage_id)?.write(path, data).await
    }

    pub async fn stat(&self, storage_id: &str, path: &ResourcePath) -> Result<Metadata> {
        self.provider(storage_id)?.stat(path).await
    }

    pub async fn delete(&self, storage_id: &str, path: &ResourcePath) -> Result<()> {
        self.provider(storage_id)?.delete(path).await
    }

    pub async fn list(&self, storage_id: &str, path: &ResourcePath) -> Result<Vec<Metadata>> {
        self.provider(storage_id)?.list(path).await
    }

    pub async fn create_dir(&self, storage_id: &str, path: &ResourcePath) -> Result<Metadata> {
        self.provider(storage_id)?.create_dir(path).await
    }
}

impl Default for StorageMux {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxd_storage::MemoryProvider;

    fn mux() -> StorageMux {
        let mut mux = StorageMux::new();
        mux.register_storage_provider(Arc::new(MemoryProvider::new("a").unwrap()))
            .unwrap();
        mux.register_storage_provider(Arc::new(MemoryProvider::new("b").unwrap()))
            .unwrap();
        mux
    }

    #[tokio::test]
    async fn test_operations_reach_named_provider_only() {
        let mux = mux();
        let path = ResourcePath::parse("/note.txt").unwrap();

        mux.write("a", &path, b"hi".to_vec()).await.unwrap();

        assert_eq!(mux.read("a", &path).await.unwrap(), b"hi");
        assert!(matches!(mux.read("b", &path).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_storage() {
        let mux = mux();
        let result = mux.stat("c", &ResourcePath::root()).await;
        assert!(matches!(result, Err(Error::ProviderNotFound { kind: "storage", .. })));
    }

    #[tokio::test]
    async fn test_provider_errors_unchanged() {
        let mux = mux();
        let dir = ResourcePath::parse("/d").unwrap();
        mux.create_dir("a", &dir).await.unwrap();

        assert!(matches!(
            mux.create_dir("a", &dir).await,
            Err(Error::AlreadyExists(_))
        ));
        mux.delete("a", &dir).await.unwrap();
        assert!(mux.list("a", &ResourcePath::root()).await.unwrap().is_empty());
    }

    #[test]
    fn test_resolve_mount() {
        let mux = mux();
        let (mount, inner) = mux
            .resolve_mount(&ResourcePath::parse("/a/docs/x").unwrap())
            .unwrap();
        assert_eq!(mount, "a");
        assert_eq!(inner.to_string_path(), "/docs/x");
        assert!(mux.resolve_mount(&ResourcePath::root()).is_err());
    }
}
