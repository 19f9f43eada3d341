//! # Queue Porter
//!
//! Transactional queue provider layered over two primitive cloud services: a
//! visibility-timeout queue service and an immutable blob store. The provider
//! turns the raw primitives into a typed, reliable at-least-once messaging
//! API with four capabilities the primitives lack:
//!
//! - **Message overflow**: payloads above the queue's per-message byte limit
//!   are transparently stored in a blob side-channel and referenced by a
//!   small wrapper message.
//! - **Poison quarantine**: delivery attempts are counted across
//!   abandon/visibility cycles and repeat-failing messages are diverted to a
//!   persistent store for inspection and replay.
//! - **In-flight tracking**: decoded payloads are correlated with their raw
//!   queue receipts, so delete/abandon/persist operate on the payload value.
//! - **Retry discipline**: every remote call runs under a policy that backs
//!   off on transient server faults and treats missing resources as logical
//!   signals rather than errors.

pub mod checkout;
pub mod envelope;
pub mod error;
pub mod poison;
pub mod provider;
pub mod retry;
pub mod serializer;

pub use error::QueueStorageError;
pub use poison::PersistedMessage;
pub use provider::{QueuePorterConfig, QueueStorageProvider};
pub use retry::RetryPolicy;
pub use serializer::{JsonSerializer, MessageSerializer, SerializationError};

// Re-export the primitive contracts that the provider is built over.
pub use storage_runtime::{BlobStorage, QueueName, QueueService, StorageError};

/// Container holding overflow blobs for oversize payloads.
///
/// The container names below are fixed for compatibility with existing
/// deployments and must not change.
pub const OVERFLOWING_MESSAGES_CONTAINER: &str = "lokad-cloud-overflowing-messages";

/// Container holding quarantined message records.
pub const PERSISTED_MESSAGES_CONTAINER: &str = "lokad-cloud-persisted-messages";

/// Store name used when the provider quarantines a message on its own.
pub const DEFAULT_POISON_STORE: &str = "failing-messages";
