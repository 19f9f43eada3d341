//! # Storage Runtime
//!
//! Primitive cloud-storage abstractions for queue-porter: a visibility-timeout
//! message queue service and an immutable blob store, together with in-memory
//! implementations for testing and development.
//!
//! This library provides:
//! - Provider-agnostic queue operations (`QueueService`)
//! - Opaque key→bytes blob operations with list-by-prefix (`BlobStorage`)
//! - Shared message and identifier types
//! - Error classification for retry logic

pub mod blob_storage;
pub mod error;
pub mod message;
pub mod providers;
pub mod queue_service;

pub use blob_storage::BlobStorage;
pub use error::{StorageError, ValidationError};
pub use message::{PeekedMessage, QueueName, RawMessage, ReceiptHandle, Timestamp};
pub use queue_service::QueueService;
