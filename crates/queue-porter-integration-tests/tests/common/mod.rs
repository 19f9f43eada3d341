//! Shared harness for provider integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use queue_porter_core::QueueStorageProvider;
use storage_runtime::providers::memory::{InMemoryBlobStorage, InMemoryQueueService};
use storage_runtime::QueueName;

/// Provider wired over fresh in-memory services, with a handle to the blob
/// service for out-of-band inspection and tampering.
pub struct TestHarness {
    pub provider: Arc<QueueStorageProvider>,
    pub blobs: Arc<InMemoryBlobStorage>,
}

/// Build a harness with the default message size budget.
pub fn harness() -> TestHarness {
    let queues = Arc::new(InMemoryQueueService::new());
    let blobs = Arc::new(InMemoryBlobStorage::new());
    let provider = Arc::new(QueueStorageProvider::new(queues, blobs.clone()));
    TestHarness { provider, blobs }
}

/// Shorthand for a validated queue name.
pub fn queue(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}
