//! Primitive blob storage contract.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Interface for an opaque key→bytes blob store
///
/// Blobs are unbounded immutable objects addressed by container and name.
/// Names are listable by prefix, which callers use to scope related blobs
/// under a shared path segment (`{queue}/{uuid}`, `{store}/{key}`).
/// Containers are created implicitly on first write.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store a blob, overwriting any existing blob with the same name
    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        body: Bytes,
    ) -> Result<(), StorageError>;

    /// Retrieve a blob, or `None` if it does not exist
    async fn get_blob(&self, container: &str, name: &str) -> Result<Option<Bytes>, StorageError>;

    /// List blob names in the container starting with the given prefix
    ///
    /// A missing container yields an empty list, not an error.
    async fn list_blobs(&self, container: &str, prefix: &str)
        -> Result<Vec<String>, StorageError>;

    /// Delete a blob; returns whether a blob was actually removed
    async fn delete_blob(&self, container: &str, name: &str) -> Result<bool, StorageError>;

    /// Check whether a blob exists
    async fn blob_exists(&self, container: &str, name: &str) -> Result<bool, StorageError>;
}
