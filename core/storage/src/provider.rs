//! Storage provider trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use muxd_common::{ProviderId, ResourcePath, Result};

/// Metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Name of the object.
    pub name: String,
    /// Path of the object inside its storage.
    pub path: String,
    /// Size in bytes (None for directories).
    pub size: Option<u64>,
    /// Whether this is a directory.
    pub is_directory: bool,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// ETag or revision ID for conflict detection.
    pub etag: Option<String>,
}

/// Storage backend plugged into the storage multiplexer.
///
/// Paths are relative to the provider's own root; the mount point has
/// already been stripped by the caller. Errors are reported with the
/// common taxonomy (`NotFound`, `AlreadyExists`, `InvalidInput`, `Io`,
/// `Storage`) and travel through the multiplexer unchanged.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Id the provider registers under (e.g., "local", "memory").
    fn id(&self) -> &ProviderId;

    /// Read the complete content of a file.
    ///
    /// # Errors
    /// - File not found
    /// - Path is a directory
    async fn read(&self, path: &ResourcePath) -> Result<Vec<u8>>;

    /// Create or replace a file.
    ///
    /// # Preconditions
    /// - Parent directory must exist
    ///
    /// # Errors
    /// - Parent directory not found
    /// - Path is a directory
    async fn write(&self, path: &ResourcePath, data: Vec<u8>) -> Result<Metadata>;

    /// Get metadata for a path.
    async fn stat(&self, path: &ResourcePath) -> Result<Metadata>;

    /// Delete a file or an empty directory.
    ///
    /// # Errors
    /// - Path not found
    /// - Directory not empty
    /// - Path is the storage root
    async fn delete(&self, path: &ResourcePath) -> Result<()>;

    /// List a directory, sorted by name.
    async fn list(&self, path: &ResourcePath) -> Result<Vec<Metadata>>;

    /// Create a directory whose parent exists.
    async fn create_dir(&self, path: &ResourcePath) -> Result<Metadata>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serialization() {
        let metadata = Metadata {
            name: "test-file.txt".to_string(),
            path: "/docs/test-file.txt".to_string(),
            size: Some(1024),
            is_directory: false,
            modified: Utc::now(),
            etag: Some("abc123".to_string()),
        };

        let json = serde_json::to_string(&metadata).unwrap();
        let deserialized: Metadata = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, metadata);
    }
}
