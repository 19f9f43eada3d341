//! In-memory queue and blob implementations for testing and development.
//!
//! This module provides fully functional in-memory services that:
//! - Implement visibility timeouts and dequeue counting
//! - Mint per-delivery receipts and expire them with visibility
//! - Provide thread-safe concurrent access
//!
//! These services are intended for:
//! - Unit and integration testing of storage-runtime consumers
//! - Development and prototyping
//! - Reference semantics for cloud implementations

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::RwLock;

use crate::blob_storage::BlobStorage;
use crate::error::StorageError;
use crate::message::{PeekedMessage, QueueName, RawMessage, ReceiptHandle, Timestamp};
use crate::queue_service::QueueService;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Azure storage queues advertise a 64 KiB budget of base64 characters.
const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

// ============================================================================
// Internal Queue Structures
// ============================================================================

/// A message sitting in the visible part of a queue
#[derive(Debug, Clone)]
struct StoredMessage {
    body: Bytes,
    dequeue_count: u32,
    inserted_at: Timestamp,
}

/// A message currently hidden by a visibility timeout
#[derive(Debug)]
struct InFlightMessage {
    message: StoredMessage,
    visible_at: Timestamp,
}

impl InFlightMessage {
    fn is_expired(&self) -> bool {
        Timestamp::now() >= self.visible_at
    }
}

/// State for a single queue
#[derive(Debug, Default)]
struct InMemoryQueue {
    /// Visible messages in FIFO order
    ready: VecDeque<StoredMessage>,
    /// Hidden messages keyed by receipt token
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    /// Move messages whose visibility timeout elapsed back to the front,
    /// oldest first. Their receipts become invalid at this point.
    fn reap_expired(&mut self) {
        let mut expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, m)| m.is_expired())
            .map(|(receipt, _)| receipt.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        // Newest first, so the final push_front sequence leaves the oldest
        // message at the head of the queue.
        expired.sort_by(|a, b| {
            let a_time = &self.in_flight[a].message.inserted_at;
            let b_time = &self.in_flight[b].message.inserted_at;
            b_time.cmp(a_time)
        });

        for receipt in expired {
            if let Some(in_flight) = self.in_flight.remove(&receipt) {
                self.ready.push_front(in_flight.message);
            }
        }
    }

    fn total_count(&self) -> usize {
        self.ready.len() + self.in_flight.len()
    }
}

// ============================================================================
// InMemoryQueueService
// ============================================================================

/// In-memory queue service implementation
pub struct InMemoryQueueService {
    queues: RwLock<HashMap<QueueName, InMemoryQueue>>,
    max_message_size: usize,
}

impl InMemoryQueueService {
    /// Create new in-memory queue service with the default message budget
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create new in-memory queue service with a custom message budget
    /// (base64 character count)
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            max_message_size,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<QueueName, InMemoryQueue>> {
        self.queues
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<QueueName, InMemoryQueue>> {
        self.queues
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for InMemoryQueueService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError> {
        let queues = self.read();
        let mut names: Vec<QueueName> = queues
            .keys()
            .filter(|name| name.as_str().starts_with(prefix))
            .cloned()
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        count: usize,
        visibility: Duration,
    ) -> Result<Vec<RawMessage>, StorageError> {
        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.reap_expired();

        let visible_at =
            Timestamp::from_datetime(Timestamp::now().as_datetime() + visibility);
        let mut delivered = Vec::new();

        while delivered.len() < count {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.dequeue_count += 1;

            let receipt = ReceiptHandle::generate();
            delivered.push(RawMessage {
                receipt: receipt.clone(),
                body: message.body.clone(),
                dequeue_count: message.dequeue_count,
                inserted_at: message.inserted_at.clone(),
            });
            state.in_flight.insert(
                receipt.as_str().to_string(),
                InFlightMessage {
                    message,
                    visible_at: visible_at.clone(),
                },
            );
        }

        Ok(delivered)
    }

    async fn peek_message(
        &self,
        queue: &QueueName,
    ) -> Result<Option<PeekedMessage>, StorageError> {
        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.reap_expired();

        Ok(state.ready.front().map(|message| PeekedMessage {
            body: message.body.clone(),
            dequeue_count: message.dequeue_count,
            inserted_at: message.inserted_at.clone(),
        }))
    }

    async fn put_message(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError> {
        let encoded_size = base64::encoded_len(body.len(), true).unwrap_or(usize::MAX);
        if encoded_size > self.max_message_size {
            return Err(StorageError::MessageTooLarge {
                size: body.len(),
                max_size: self.max_message_size,
            });
        }

        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.ready.push_back(StoredMessage {
            body,
            dequeue_count: 0,
            inserted_at: Timestamp::now(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        queue: &QueueName,
        receipt: &ReceiptHandle,
    ) -> Result<(), StorageError> {
        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.reap_expired();

        if state.in_flight.remove(receipt.as_str()).is_none() {
            return Err(StorageError::MessageNotFound {
                receipt: receipt.to_string(),
            });
        }
        Ok(())
    }

    async fn clear_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.ready.clear();
        state.in_flight.clear();
        Ok(())
    }

    async fn create_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let mut queues = self.write();
        queues.entry(queue.clone()).or_default();
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let mut queues = self.write();
        if queues.remove(queue).is_none() {
            return Err(StorageError::QueueNotFound {
                queue: queue.to_string(),
            });
        }
        Ok(())
    }

    async fn approximate_message_count(&self, queue: &QueueName) -> Result<usize, StorageError> {
        let queues = self.read();
        let state = queues.get(queue).ok_or_else(|| StorageError::QueueNotFound {
            queue: queue.to_string(),
        })?;
        Ok(state.total_count())
    }

    fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

// ============================================================================
// InMemoryBlobStorage
// ============================================================================

/// In-memory blob storage implementation
///
/// Containers are plain namespaces created implicitly on first write; blob
/// names within a container are kept sorted so prefix listing is ordered.
pub struct InMemoryBlobStorage {
    containers: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl InMemoryBlobStorage {
    /// Create new empty blob storage
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
        }
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, BTreeMap<String, Bytes>>> {
        self.containers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, BTreeMap<String, Bytes>>> {
        self.containers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for InMemoryBlobStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        body: Bytes,
    ) -> Result<(), StorageError> {
        let mut containers = self.write();
        containers
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), body);
        Ok(())
    }

    async fn get_blob(&self, container: &str, name: &str) -> Result<Option<Bytes>, StorageError> {
        let containers = self.read();
        Ok(containers
            .get(container)
            .and_then(|blobs| blobs.get(name))
            .cloned())
    }

    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let containers = self.read();
        Ok(containers
            .get(container)
            .map(|blobs| {
                blobs
                    .range(prefix.to_string()..)
                    .take_while(|(name, _)| name.starts_with(prefix))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_blob(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let mut containers = self.write();
        Ok(containers
            .get_mut(container)
            .map(|blobs| blobs.remove(name).is_some())
            .unwrap_or(false))
    }

    async fn blob_exists(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let containers = self.read();
        Ok(containers
            .get(container)
            .map(|blobs| blobs.contains_key(name))
            .unwrap_or(false))
    }
}
