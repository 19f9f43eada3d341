//! Error type for provider operations.

use thiserror::Error;

use crate::serializer::SerializationError;
use storage_runtime::StorageError;

/// Errors surfaced by [`QueueStorageProvider`](crate::provider::QueueStorageProvider)
///
/// The provider swallows the logical signals described in its operation
/// contracts (missing queues on read paths, poison messages, missing
/// overflow blobs); everything that reaches the caller through this type is
/// a genuine fault.
#[derive(Debug, Error)]
pub enum QueueStorageError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
