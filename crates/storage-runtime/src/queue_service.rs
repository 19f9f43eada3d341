//! Primitive queue service contract.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;

use crate::error::StorageError;
use crate::message::{PeekedMessage, QueueName, RawMessage, ReceiptHandle};

/// Interface for a visibility-timeout message queue service
///
/// Models the primitive semantics of a cloud storage queue: short,
/// size-limited messages identified by opaque receipts. A `get` hides each
/// returned message from other consumers for the requested visibility
/// duration; a message that is not deleted in time reappears with its
/// dequeue count incremented. The dequeue count resets whenever a message is
/// re-put, which is why higher layers carry their own counter.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// List queue names starting with the given prefix
    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError>;

    /// Dequeue up to `count` messages, hiding each for `visibility`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QueueNotFound`] if the queue does not exist.
    async fn get_messages(
        &self,
        queue: &QueueName,
        count: usize,
        visibility: Duration,
    ) -> Result<Vec<RawMessage>, StorageError>;

    /// Observe the next visible message without dequeuing it
    async fn peek_message(&self, queue: &QueueName)
        -> Result<Option<PeekedMessage>, StorageError>;

    /// Add a message to the queue
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QueueNotFound`] if the queue does not exist
    /// (queues are never created implicitly) and
    /// [`StorageError::MessageTooLarge`] if the encoded body would exceed
    /// [`max_message_size`](Self::max_message_size).
    async fn put_message(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError>;

    /// Delete a previously dequeued message by its receipt
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MessageNotFound`] once the receipt has
    /// expired or the message was already deleted.
    async fn delete_message(
        &self,
        queue: &QueueName,
        receipt: &ReceiptHandle,
    ) -> Result<(), StorageError>;

    /// Delete every message in the queue, visible or in flight
    async fn clear_queue(&self, queue: &QueueName) -> Result<(), StorageError>;

    /// Create the queue if it does not already exist (idempotent)
    async fn create_queue(&self, queue: &QueueName) -> Result<(), StorageError>;

    /// Delete the queue and all its messages
    async fn delete_queue(&self, queue: &QueueName) -> Result<(), StorageError>;

    /// Approximate number of messages, visible and in flight
    async fn approximate_message_count(&self, queue: &QueueName) -> Result<usize, StorageError>;

    /// Advertised maximum per-message size, expressed as the base64
    /// character count of the encoded body
    fn max_message_size(&self) -> usize;
}
