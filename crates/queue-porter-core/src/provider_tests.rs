//! Tests for the queue provider.
//!
//! End-to-end scenarios over the in-memory services live in the
//! integration-test crate; these tests cover the provider's edge behavior
//! and internals.

use super::*;
use storage_runtime::providers::memory::{InMemoryBlobStorage, InMemoryQueueService};

fn queue_name(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

fn provider_over(
    queues: Arc<InMemoryQueueService>,
    blobs: Arc<InMemoryBlobStorage>,
) -> QueueStorageProvider {
    QueueStorageProvider::new(queues, blobs)
}

fn small_queue_provider(max_message_size: usize) -> (QueueStorageProvider, Arc<InMemoryBlobStorage>)
{
    let queues = Arc::new(InMemoryQueueService::with_max_message_size(max_message_size));
    let blobs = Arc::new(InMemoryBlobStorage::new());
    (provider_over(queues, blobs.clone()), blobs)
}

fn default_provider() -> (QueueStorageProvider, Arc<InMemoryBlobStorage>) {
    let queues = Arc::new(InMemoryQueueService::new());
    let blobs = Arc::new(InMemoryBlobStorage::new());
    (provider_over(queues, blobs.clone()), blobs)
}

// ============================================================================
// Threshold Tests
// ============================================================================

mod threshold {
    use super::*;

    /// Verify the payload byte budget derived from the base64 character
    /// budget.
    #[test]
    fn test_max_payload_size() {
        let (provider, _) = small_queue_provider(64 * 1024);
        assert_eq!(provider.max_payload_size(), (64 * 1024 - 1) * 3 / 4);
    }

    /// Verify a payload at the threshold takes the raw path and one byte
    /// above takes the overflow path.
    #[tokio::test]
    async fn test_threshold_boundary() {
        let (provider, blobs) = small_queue_provider(64 * 1024);
        let queue = queue_name("orders");
        let threshold = provider.max_payload_size();

        // A JSON string serializes to its content plus two quotes.
        let at_threshold = "a".repeat(threshold - 2);
        provider.put(&queue, &at_threshold).await.unwrap();
        assert!(blobs
            .list_blobs(OVERFLOWING_MESSAGES_CONTAINER, "orders/")
            .await
            .unwrap()
            .is_empty());

        let above_threshold = "a".repeat(threshold - 1);
        provider.put(&queue, &above_threshold).await.unwrap();
        assert_eq!(
            blobs
                .list_blobs(OVERFLOWING_MESSAGES_CONTAINER, "orders/")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    /// Verify a runtime size rejection from the queue service falls back to
    /// the overflow path even when the pre-check passes.
    #[tokio::test]
    async fn test_runtime_rejection_falls_back_to_overflow() {
        // A service that advertises a generous budget but enforces a small
        // one, so the pre-check admits bodies the put then rejects.
        let queues = Arc::new(MisadvertisingQueueService {
            inner: InMemoryQueueService::with_max_message_size(512),
        });
        let blobs = Arc::new(InMemoryBlobStorage::new());
        let provider = QueueStorageProvider::new(queues, blobs.clone());
        let queue = queue_name("orders");

        provider.put(&queue, &"a".repeat(1000)).await.unwrap();

        assert_eq!(
            blobs
                .list_blobs(OVERFLOWING_MESSAGES_CONTAINER, "orders/")
                .await
                .unwrap()
                .len(),
            1
        );
        let got: Vec<String> = provider
            .get(&queue, 1, chrono::Duration::seconds(30), 5)
            .await
            .unwrap();
        assert_eq!(got, vec!["a".repeat(1000)]);
    }
}

/// Queue service double that advertises a generous message budget while its
/// backing service enforces a small one
struct MisadvertisingQueueService {
    inner: InMemoryQueueService,
}

#[async_trait::async_trait]
impl storage_runtime::QueueService for MisadvertisingQueueService {
    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError> {
        self.inner.list_queues(prefix).await
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        count: usize,
        visibility: chrono::Duration,
    ) -> Result<Vec<storage_runtime::RawMessage>, StorageError> {
        self.inner.get_messages(queue, count, visibility).await
    }

    async fn peek_message(
        &self,
        queue: &QueueName,
    ) -> Result<Option<storage_runtime::PeekedMessage>, StorageError> {
        self.inner.peek_message(queue).await
    }

    async fn put_message(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError> {
        self.inner.put_message(queue, body).await
    }

    async fn delete_message(
        &self,
        queue: &QueueName,
        receipt: &ReceiptHandle,
    ) -> Result<(), StorageError> {
        self.inner.delete_message(queue, receipt).await
    }

    async fn clear_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        self.inner.clear_queue(queue).await
    }

    async fn create_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        self.inner.create_queue(queue).await
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        self.inner.delete_queue(queue).await
    }

    async fn approximate_message_count(&self, queue: &QueueName) -> Result<usize, StorageError> {
        self.inner.approximate_message_count(queue).await
    }

    fn max_message_size(&self) -> usize {
        64 * 1024
    }
}

// ============================================================================
// Read-Path Edge Cases
// ============================================================================

mod read_path {
    use super::*;

    /// Verify a missing queue reads as empty rather than an error.
    #[tokio::test]
    async fn test_get_on_missing_queue_is_empty() {
        let (provider, _) = default_provider();
        let got: Vec<String> = provider
            .get(&queue_name("ghost"), 5, chrono::Duration::seconds(30), 3)
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(provider.in_flight_count(), 0);
    }

    /// Verify a message whose overflow blob vanished is dropped and its raw
    /// message deleted.
    #[tokio::test]
    async fn test_missing_overflow_blob_drops_message() {
        let (provider, blobs) = small_queue_provider(512);
        let queue = queue_name("orders");

        provider.put(&queue, &"a".repeat(1000)).await.unwrap();

        // Remove the side-channel blob out-of-band.
        let names = blobs
            .list_blobs(OVERFLOWING_MESSAGES_CONTAINER, "orders/")
            .await
            .unwrap();
        assert_eq!(names.len(), 1);
        blobs
            .delete_blob(OVERFLOWING_MESSAGES_CONTAINER, &names[0])
            .await
            .unwrap();

        let got: Vec<String> = provider
            .get(&queue, 1, chrono::Duration::seconds(30), 5)
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(provider.in_flight_count(), 0);
        assert_eq!(provider.approximate_count(&queue).await.unwrap(), 0);
    }

    /// Verify undecodable bytes are quarantined with a decode reason and
    /// never returned again.
    #[tokio::test]
    async fn test_undecodable_message_is_quarantined() {
        let (provider, _) = default_provider();
        let queue = queue_name("orders");

        provider.put(&queue, &"not a number").await.unwrap();

        let got: Vec<u64> = provider
            .get(&queue, 1, chrono::Duration::seconds(30), 5)
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(provider.approximate_count(&queue).await.unwrap(), 0);

        let keys = provider.list_persisted(DEFAULT_POISON_STORE).await.unwrap();
        assert_eq!(keys.len(), 1);
        let persisted = provider
            .get_persisted(DEFAULT_POISON_STORE, &keys[0])
            .await
            .unwrap()
            .unwrap();
        assert!(persisted.reason.starts_with("failed to deserialize"));
        assert!(persisted.is_data_available);
        assert_eq!(
            persisted.payload,
            Some(serde_json::Value::String("not a number".to_string()))
        );
    }
}

// ============================================================================
// Check-In Edge Cases
// ============================================================================

mod check_in {
    use super::*;

    /// Verify delete/abandon/persist report false for payloads that are not
    /// in flight.
    #[tokio::test]
    async fn test_operations_on_unknown_payload() {
        let (provider, _) = default_provider();

        assert!(!provider.delete(&"ghost").await.unwrap());
        assert!(!provider.abandon(&"ghost").await.unwrap());
        assert!(!provider
            .persist(&"ghost", "store", "reason")
            .await
            .unwrap());
    }

    /// Verify delete tolerates the raw message vanishing out-of-band.
    #[tokio::test]
    async fn test_delete_tolerates_missing_raw_message() {
        let (provider, _) = default_provider();
        let queue = queue_name("orders");

        provider.put(&queue, &"msg").await.unwrap();
        let got: Vec<String> = provider
            .get(&queue, 1, chrono::Duration::seconds(30), 5)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);

        // The queue vanishes while the message is in flight.
        provider.delete_queue(&queue).await.unwrap();

        assert!(provider.delete(&got[0]).await.unwrap());
        assert_eq!(provider.in_flight_count(), 0);
    }
}

// ============================================================================
// Persisted Store Edge Cases
// ============================================================================

mod persisted_store {
    use super::*;

    /// Verify lookups of unknown records are no-ops.
    #[tokio::test]
    async fn test_missing_record_reads_as_absent() {
        let (provider, _) = default_provider();

        assert!(provider
            .get_persisted("store", "missing")
            .await
            .unwrap()
            .is_none());
        assert!(!provider.restore_persisted("store", "missing").await.unwrap());
        provider.delete_persisted("store", "missing").await.unwrap();
        assert!(provider.list_persisted("store").await.unwrap().is_empty());
    }

    /// Verify store listings do not bleed across store names.
    #[tokio::test]
    async fn test_stores_are_isolated() {
        let (provider, _) = default_provider();
        let queue = queue_name("orders");

        provider.put(&queue, &"msg").await.unwrap();
        let got: Vec<String> = provider
            .get(&queue, 1, chrono::Duration::seconds(30), 5)
            .await
            .unwrap();
        assert!(provider.persist(&got[0], "store-a", "why").await.unwrap());

        assert_eq!(provider.list_persisted("store-a").await.unwrap().len(), 1);
        assert!(provider.list_persisted("store-b").await.unwrap().is_empty());
    }
}
