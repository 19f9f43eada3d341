//! Tests for the in-memory queue and blob services.

use super::*;

fn queue_name(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

// ============================================================================
// Queue Lifecycle Tests
// ============================================================================

mod queue_lifecycle {
    use super::*;

    /// Verify that operations on a missing queue report QueueNotFound.
    #[tokio::test]
    async fn test_missing_queue_is_reported() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("missing");

        let err = service
            .get_messages(&queue, 1, Duration::seconds(30))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::QueueNotFound { .. }));

        let err = service
            .put_message(&queue, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::QueueNotFound { .. }));
    }

    /// Verify create is idempotent and delete reports a missing queue.
    #[tokio::test]
    async fn test_create_and_delete() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");

        service.create_queue(&queue).await.unwrap();
        service.create_queue(&queue).await.unwrap();

        service.delete_queue(&queue).await.unwrap();
        let err = service.delete_queue(&queue).await.unwrap_err();
        assert!(matches!(err, StorageError::QueueNotFound { .. }));
    }

    /// Verify prefix listing returns sorted matches only.
    #[tokio::test]
    async fn test_list_queues_by_prefix() {
        let service = InMemoryQueueService::new();
        for name in ["orders-eu", "orders-us", "billing"] {
            service.create_queue(&queue_name(name)).await.unwrap();
        }

        let names = service.list_queues("orders").await.unwrap();
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["orders-eu", "orders-us"]);
    }
}

// ============================================================================
// Message Flow Tests
// ============================================================================

mod message_flow {
    use super::*;

    /// Verify a put message round-trips through get with dequeue count 1.
    #[tokio::test]
    async fn test_put_then_get() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();

        service
            .put_message(&queue, Bytes::from_static(b"payload"))
            .await
            .unwrap();

        let messages = service
            .get_messages(&queue, 10, Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, Bytes::from_static(b"payload"));
        assert_eq!(messages[0].dequeue_count, 1);
    }

    /// Verify a dequeued message is hidden until its visibility expires,
    /// then reappears with an incremented dequeue count.
    #[tokio::test]
    async fn test_visibility_timeout_redelivery() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();
        service
            .put_message(&queue, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let first = service
            .get_messages(&queue, 1, Duration::milliseconds(50))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        // Hidden while in flight
        let hidden = service
            .get_messages(&queue, 1, Duration::milliseconds(50))
            .await
            .unwrap();
        assert!(hidden.is_empty());

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        let second = service
            .get_messages(&queue, 1, Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].dequeue_count, 2);
        assert_ne!(second[0].receipt, first[0].receipt);
    }

    /// Verify delete consumes the receipt and a second delete fails.
    #[tokio::test]
    async fn test_delete_by_receipt() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();
        service
            .put_message(&queue, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let messages = service
            .get_messages(&queue, 1, Duration::seconds(30))
            .await
            .unwrap();
        let receipt = messages[0].receipt.clone();

        service.delete_message(&queue, &receipt).await.unwrap();
        assert_eq!(service.approximate_message_count(&queue).await.unwrap(), 0);

        let err = service.delete_message(&queue, &receipt).await.unwrap_err();
        assert!(matches!(err, StorageError::MessageNotFound { .. }));
    }

    /// Verify a receipt stops working once visibility expired and the
    /// message was handed out again.
    #[tokio::test]
    async fn test_expired_receipt_is_invalid() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();
        service
            .put_message(&queue, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let first = service
            .get_messages(&queue, 1, Duration::milliseconds(20))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let err = service
            .delete_message(&queue, &first[0].receipt)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MessageNotFound { .. }));
    }

    /// Verify peek observes without consuming and yields no receipt.
    #[tokio::test]
    async fn test_peek_does_not_dequeue() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();
        service
            .put_message(&queue, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let peeked = service.peek_message(&queue).await.unwrap().unwrap();
        assert_eq!(peeked.body, Bytes::from_static(b"x"));
        assert_eq!(peeked.dequeue_count, 0);

        // Still available to a real get
        let messages = service
            .get_messages(&queue, 1, Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
    }

    /// Verify the advertised size budget is enforced on put.
    #[tokio::test]
    async fn test_message_size_budget() {
        let service = InMemoryQueueService::with_max_message_size(64);
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();

        // 48 bytes encode to exactly 64 base64 characters
        service
            .put_message(&queue, Bytes::from(vec![0u8; 48]))
            .await
            .unwrap();

        let err = service
            .put_message(&queue, Bytes::from(vec![0u8; 49]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MessageTooLarge { .. }));
    }

    /// Verify clear removes both visible and in-flight messages.
    #[tokio::test]
    async fn test_clear_queue() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();
        for _ in 0..3 {
            service
                .put_message(&queue, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        service
            .get_messages(&queue, 1, Duration::seconds(30))
            .await
            .unwrap();

        service.clear_queue(&queue).await.unwrap();
        assert_eq!(service.approximate_message_count(&queue).await.unwrap(), 0);
    }

    /// Verify the approximate count includes in-flight messages.
    #[tokio::test]
    async fn test_count_includes_in_flight() {
        let service = InMemoryQueueService::new();
        let queue = queue_name("orders");
        service.create_queue(&queue).await.unwrap();
        for _ in 0..3 {
            service
                .put_message(&queue, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        service
            .get_messages(&queue, 2, Duration::seconds(30))
            .await
            .unwrap();

        assert_eq!(service.approximate_message_count(&queue).await.unwrap(), 3);
    }
}

// ============================================================================
// Blob Storage Tests
// ============================================================================

mod blob_storage {
    use super::*;

    /// Verify blob round-trip and overwrite.
    #[tokio::test]
    async fn test_put_get_overwrite() {
        let storage = InMemoryBlobStorage::new();

        storage
            .put_blob("container", "a/1", Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(
            storage.get_blob("container", "a/1").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );

        storage
            .put_blob("container", "a/1", Bytes::from_static(b"two"))
            .await
            .unwrap();
        assert_eq!(
            storage.get_blob("container", "a/1").await.unwrap(),
            Some(Bytes::from_static(b"two"))
        );
    }

    /// Verify missing blobs and containers read back as absent.
    #[tokio::test]
    async fn test_missing_blob() {
        let storage = InMemoryBlobStorage::new();
        assert_eq!(storage.get_blob("container", "nope").await.unwrap(), None);
        assert!(!storage.blob_exists("container", "nope").await.unwrap());
        assert!(!storage.delete_blob("container", "nope").await.unwrap());
        assert!(storage.list_blobs("container", "").await.unwrap().is_empty());
    }

    /// Verify prefix listing is scoped and sorted.
    #[tokio::test]
    async fn test_list_by_prefix() {
        let storage = InMemoryBlobStorage::new();
        for name in ["q1/b", "q1/a", "q2/c"] {
            storage
                .put_blob("container", name, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let names = storage.list_blobs("container", "q1/").await.unwrap();
        assert_eq!(names, vec!["q1/a".to_string(), "q1/b".to_string()]);
    }

    /// Verify delete reports whether a blob was removed.
    #[tokio::test]
    async fn test_delete_reports_removal() {
        let storage = InMemoryBlobStorage::new();
        storage
            .put_blob("container", "a", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(storage.delete_blob("container", "a").await.unwrap());
        assert!(!storage.delete_blob("container", "a").await.unwrap());
    }
}
