//! The transactional queue provider.

use bytes::Bytes;
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::checkout::{CheckedOutMessage, CheckoutKey, CheckoutTable};
use crate::envelope::{MessageEnvelope, MessageWrapper};
use crate::error::QueueStorageError;
use crate::poison::{PersistedMessage, PersistedMessageRecord};
use crate::retry::RetryPolicy;
use crate::serializer::{JsonSerializer, MessageSerializer};
use crate::{DEFAULT_POISON_STORE, OVERFLOWING_MESSAGES_CONTAINER, PERSISTED_MESSAGES_CONTAINER};
use storage_runtime::{
    BlobStorage, QueueName, QueueService, ReceiptHandle, StorageError, Timestamp,
};

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

/// Configuration for the queue provider
#[derive(Debug, Clone)]
pub struct QueuePorterConfig {
    /// Store receiving messages the provider quarantines on its own
    pub poison_store: String,

    /// Policy applied to every remote call
    pub transient_retry: RetryPolicy,

    /// Patient policy applied while a freshly created queue becomes
    /// available
    pub instantiation_retry: RetryPolicy,
}

impl Default for QueuePorterConfig {
    fn default() -> Self {
        Self {
            poison_store: DEFAULT_POISON_STORE.to_string(),
            transient_retry: RetryPolicy::transient_server_backoff(),
            instantiation_retry: RetryPolicy::slow_instantiation(),
        }
    }
}

/// Typed, reliable messaging API over the primitive queue and blob services
///
/// Payloads above the queue's per-message limit are transparently written to
/// an overflow blob; delivery attempts are counted across abandon cycles via
/// an envelope record; repeat-failing or undecodable messages are moved to a
/// quarantine store; and every decoded payload is tracked in an in-process
/// checkout table so that [`delete`](Self::delete), [`abandon`](Self::abandon),
/// and [`persist`](Self::persist) operate on the payload value itself.
///
/// The provider is thread-safe: every method may be invoked concurrently.
/// One mutex guards the checkout table and is never held across a remote
/// call. Callers should invoke [`close`](Self::close) at shutdown to return
/// in-flight messages to their queues.
pub struct QueueStorageProvider<S: MessageSerializer = JsonSerializer> {
    queues: Arc<dyn QueueService>,
    blobs: Arc<dyn BlobStorage>,
    serializer: S,
    config: QueuePorterConfig,
    checkouts: Mutex<CheckoutTable>,
}

impl QueueStorageProvider<JsonSerializer> {
    /// Create provider with the JSON serializer and default configuration
    pub fn new(queues: Arc<dyn QueueService>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self::with_serializer(queues, blobs, JsonSerializer::new(), QueuePorterConfig::default())
    }
}

impl<S: MessageSerializer> QueueStorageProvider<S> {
    /// Create provider with a custom serializer and configuration
    pub fn with_serializer(
        queues: Arc<dyn QueueService>,
        blobs: Arc<dyn BlobStorage>,
        serializer: S,
        config: QueuePorterConfig,
    ) -> Self {
        Self {
            queues,
            blobs,
            serializer,
            config,
            checkouts: Mutex::new(CheckoutTable::new()),
        }
    }

    // ========================================================================
    // Queue Operations
    // ========================================================================

    /// List queue names starting with the given prefix
    pub async fn list(&self, prefix: &str) -> Result<Vec<QueueName>, QueueStorageError> {
        Ok(self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.queues.list_queues(prefix)
            })
            .await?)
    }

    /// Dequeue up to `count` payloads, hiding each for `visibility`
    ///
    /// Messages whose effective dequeue count exceeds `max_trials`, and
    /// messages that decode neither as `T` nor as an overflow wrapper, are
    /// moved to the quarantine store and never returned. Overflowed payloads
    /// are fetched from their side-channel blob; a wrapper whose blob has
    /// vanished is dropped silently. A missing queue yields an empty
    /// sequence.
    ///
    /// Every returned payload is checked out and must be handed back through
    /// [`delete`](Self::delete), [`abandon`](Self::abandon), or
    /// [`persist`](Self::persist).
    pub async fn get<T>(
        &self,
        queue: &QueueName,
        count: usize,
        visibility: Duration,
        max_trials: u32,
    ) -> Result<Vec<T>, QueueStorageError>
    where
        T: Serialize + DeserializeOwned,
    {
        let raw_messages = match self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.queues.get_messages(queue, count, visibility)
            })
            .await
        {
            Ok(messages) => messages,
            Err(error) if error.is_not_found() => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut results = Vec::new();
        let mut deferred: Vec<DeferredWrapper> = Vec::new();
        let mut quarantined: Vec<QuarantineCandidate> = Vec::new();

        {
            let mut table = self.lock_checkouts();
            for raw in raw_messages {
                // Peel the envelope, if any, accumulating its carried count
                // into the effective dequeue count.
                let (dequeue_count, body) =
                    match self.serializer.deserialize::<MessageEnvelope>(&raw.body) {
                        Ok(envelope) => (
                            raw.dequeue_count + envelope.dequeue_count,
                            envelope.raw_message,
                        ),
                        Err(_) => (raw.dequeue_count, raw.body.clone()),
                    };

                if dequeue_count > max_trials {
                    quarantined.push(QuarantineCandidate {
                        receipt: raw.receipt,
                        body,
                        inserted_at: raw.inserted_at,
                        dequeue_count,
                        reason: format!(
                            "dequeued {} times but failed processing each time",
                            dequeue_count - 1
                        ),
                    });
                    continue;
                }

                match self.serializer.deserialize::<T>(&body) {
                    Ok(payload) => {
                        let key = CheckoutKey::new(self.serializer.serialize(&payload)?);
                        table.check_out(
                            key,
                            CheckedOutMessage {
                                receipt: raw.receipt,
                                body,
                                inserted_at: raw.inserted_at,
                            },
                            queue,
                            false,
                            dequeue_count,
                        );
                        results.push(payload);
                    }
                    Err(payload_error) => {
                        match self.serializer.deserialize::<MessageWrapper>(&body) {
                            Ok(wrapper) => {
                                let key = CheckoutKey::new(body.clone());
                                table.check_out(
                                    key.clone(),
                                    CheckedOutMessage {
                                        receipt: raw.receipt.clone(),
                                        body,
                                        inserted_at: raw.inserted_at,
                                    },
                                    queue,
                                    true,
                                    dequeue_count,
                                );
                                deferred.push(DeferredWrapper {
                                    wrapper,
                                    key,
                                    receipt: raw.receipt,
                                });
                            }
                            Err(_) => {
                                quarantined.push(QuarantineCandidate {
                                    receipt: raw.receipt,
                                    body,
                                    inserted_at: raw.inserted_at,
                                    dequeue_count,
                                    reason: format!(
                                        "failed to deserialize ({})",
                                        payload_error.detail()
                                    ),
                                });
                            }
                        }
                    }
                }
            }
        }

        for candidate in quarantined {
            info!(
                queue = %queue,
                dequeue_count = candidate.dequeue_count,
                reason = %candidate.reason,
                "quarantining poison message"
            );
            let record = PersistedMessageRecord {
                queue_name: queue.to_string(),
                inserted_at: candidate.inserted_at,
                persisted_at: Timestamp::now(),
                dequeue_count: candidate.dequeue_count,
                reason: candidate.reason,
                data: candidate.body,
            };
            self.write_persisted_record(&self.config.poison_store, &record)
                .await?;
            self.delete_raw_message(queue, &candidate.receipt).await?;
        }

        // Overflow blobs are fetched with the checkout lock released.
        for DeferredWrapper {
            wrapper,
            key,
            receipt,
        } in deferred
        {
            let blob = self
                .config
                .transient_retry
                .run(StorageError::is_transient, || {
                    self.blobs
                        .get_blob(&wrapper.container_name, &wrapper.blob_name)
                })
                .await?;

            match blob {
                None => {
                    warn!(
                        queue = %queue,
                        blob = %wrapper.blob_name,
                        "overflow blob missing; dropping raw message"
                    );
                    self.delete_raw_message(queue, &receipt).await?;
                    self.lock_checkouts().check_in(&key);
                }
                Some(payload_bytes) => {
                    let payload: T = self.serializer.deserialize(&payload_bytes)?;
                    let payload_key = CheckoutKey::new(self.serializer.serialize(&payload)?);
                    self.lock_checkouts().relink(&key, payload_key);
                    results.push(payload);
                }
            }
        }

        Ok(results)
    }

    /// Enqueue a payload, taking the overflow path when it exceeds the
    /// queue's per-message limit. A missing queue is created lazily.
    pub async fn put<T: Serialize>(
        &self,
        queue: &QueueName,
        message: &T,
    ) -> Result<(), QueueStorageError> {
        let bytes = self.serializer.serialize(message)?;
        self.put_bytes(queue, bytes).await
    }

    /// Enqueue a batch of payloads
    pub async fn put_range<T: Serialize>(
        &self,
        queue: &QueueName,
        messages: &[T],
    ) -> Result<(), QueueStorageError> {
        for message in messages {
            self.put(queue, message).await?;
        }
        Ok(())
    }

    /// Delete an in-flight payload and its overflow blob, if any
    ///
    /// Returns `false` when the payload is not checked out.
    pub async fn delete<T: Serialize>(&self, message: &T) -> Result<bool, QueueStorageError> {
        let key = self.payload_key(message)?;
        self.delete_key(&key).await
    }

    /// Delete a batch of in-flight payloads, returning how many were found
    pub async fn delete_range<T: Serialize>(
        &self,
        messages: &[T],
    ) -> Result<usize, QueueStorageError> {
        let mut deleted = 0;
        for message in messages {
            if self.delete(message).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Return an in-flight payload to its queue for another attempt
    ///
    /// The message is re-put wrapped in an envelope carrying the effective
    /// dequeue count, because the primitive counter resets on re-put and
    /// poison detection must survive the cycle. Returns `false` when the
    /// payload is not checked out.
    pub async fn abandon<T: Serialize>(&self, message: &T) -> Result<bool, QueueStorageError> {
        let key = self.payload_key(message)?;
        self.abandon_key(&key).await
    }

    /// Abandon a batch of in-flight payloads, returning how many were found
    pub async fn abandon_range<T: Serialize>(
        &self,
        messages: &[T],
    ) -> Result<usize, QueueStorageError> {
        let mut abandoned = 0;
        for message in messages {
            if self.abandon(message).await? {
                abandoned += 1;
            }
        }
        Ok(abandoned)
    }

    /// Move an in-flight payload to the given quarantine store
    ///
    /// Returns `false` when the payload is not checked out.
    pub async fn persist<T: Serialize>(
        &self,
        message: &T,
        store: &str,
        reason: &str,
    ) -> Result<bool, QueueStorageError> {
        let key = self.payload_key(message)?;
        let Some(view) = self.lock_checkouts().peek(&key) else {
            return Ok(false);
        };

        info!(queue = %view.queue, store, reason, "persisting in-flight message");
        let record = PersistedMessageRecord {
            queue_name: view.queue.to_string(),
            inserted_at: view.message.inserted_at.clone(),
            persisted_at: Timestamp::now(),
            dequeue_count: view.dequeue_count,
            reason: reason.to_string(),
            data: view.message.body.clone(),
        };
        self.write_persisted_record(store, &record).await?;
        self.delete_raw_message(&view.queue, &view.message.receipt)
            .await?;
        self.lock_checkouts().check_in(&key);
        Ok(true)
    }

    /// Persist a batch of in-flight payloads, returning how many were found
    pub async fn persist_range<T: Serialize>(
        &self,
        messages: &[T],
        store: &str,
        reason: &str,
    ) -> Result<usize, QueueStorageError> {
        let mut persisted = 0;
        for message in messages {
            if self.persist(message, store, reason).await? {
                persisted += 1;
            }
        }
        Ok(persisted)
    }

    /// Delete every queued message and every overflow blob of the queue
    pub async fn clear(&self, queue: &QueueName) -> Result<(), QueueStorageError> {
        // Overflow blobs go first so a concurrent reader cannot observe a
        // wrapper pointing at a missing blob.
        self.delete_overflow_blobs(queue).await?;
        match self
            .config
            .transient_retry
            .run(StorageError::is_transient, || self.queues.clear_queue(queue))
            .await
        {
            Err(error) if error.is_not_found() => Ok(()),
            result => Ok(result?),
        }
    }

    /// Delete the queue and its overflow blobs; returns whether the queue
    /// existed
    pub async fn delete_queue(&self, queue: &QueueName) -> Result<bool, QueueStorageError> {
        self.delete_overflow_blobs(queue).await?;
        match self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.queues.delete_queue(queue)
            })
            .await
        {
            Ok(()) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Approximate number of messages in the queue; a missing queue counts
    /// as zero
    pub async fn approximate_count(&self, queue: &QueueName) -> Result<usize, QueueStorageError> {
        match self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.queues.approximate_message_count(queue)
            })
            .await
        {
            Err(error) if error.is_not_found() => Ok(0),
            result => Ok(result?),
        }
    }

    /// Age of the oldest visible message, or `None` for an empty or missing
    /// queue
    pub async fn approximate_latency(
        &self,
        queue: &QueueName,
    ) -> Result<Option<Duration>, QueueStorageError> {
        match self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.queues.peek_message(queue)
            })
            .await
        {
            Ok(Some(peeked)) => Ok(Some(peeked.inserted_at.age())),
            Ok(None) => Ok(None),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    // ========================================================================
    // Quarantine Store Operations
    // ========================================================================

    /// List record keys in a quarantine store
    pub async fn list_persisted(&self, store: &str) -> Result<Vec<String>, QueueStorageError> {
        let prefix = format!("{store}/");
        let names = self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs.list_blobs(PERSISTED_MESSAGES_CONTAINER, &prefix)
            })
            .await?;
        Ok(names
            .iter()
            .filter_map(|name| name.strip_prefix(&prefix))
            .map(str::to_string)
            .collect())
    }

    /// Inspect a quarantined message
    pub async fn get_persisted(
        &self,
        store: &str,
        key: &str,
    ) -> Result<Option<PersistedMessage>, QueueStorageError> {
        let Some(record) = self.read_persisted_record(store, key).await? else {
            return Ok(None);
        };

        let (is_data_available, payload) =
            match self.serializer.deserialize::<MessageWrapper>(&record.data) {
                Ok(wrapper) => {
                    let blob = self
                        .config
                        .transient_retry
                        .run(StorageError::is_transient, || {
                            self.blobs
                                .get_blob(&wrapper.container_name, &wrapper.blob_name)
                        })
                        .await?;
                    let payload = blob
                        .as_ref()
                        .and_then(|bytes| self.serializer.unpack_json(bytes));
                    (blob.is_some(), payload)
                }
                Err(_) => (true, self.serializer.unpack_json(&record.data)),
            };

        Ok(Some(PersistedMessage {
            store_name: store.to_string(),
            key: key.to_string(),
            queue_name: record.queue_name,
            inserted_at: record.inserted_at,
            persisted_at: record.persisted_at,
            dequeue_count: record.dequeue_count,
            reason: record.reason,
            is_data_available,
            payload,
        }))
    }

    /// Delete a quarantined message, co-deleting its overflow blob when the
    /// record wraps one. A missing record is a no-op.
    pub async fn delete_persisted(
        &self,
        store: &str,
        key: &str,
    ) -> Result<(), QueueStorageError> {
        let Some(record) = self.read_persisted_record(store, key).await? else {
            return Ok(());
        };

        if let Ok(wrapper) = self.serializer.deserialize::<MessageWrapper>(&record.data) {
            self.delete_overflow_blob(&wrapper).await?;
        }

        let blob_name = format!("{store}/{key}");
        self.config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs
                    .delete_blob(PERSISTED_MESSAGES_CONTAINER, &blob_name)
            })
            .await?;
        Ok(())
    }

    /// Put a quarantined message back onto its originating queue verbatim
    /// and delete the record. Returns whether a record was restored.
    pub async fn restore_persisted(
        &self,
        store: &str,
        key: &str,
    ) -> Result<bool, QueueStorageError> {
        let Some(record) = self.read_persisted_record(store, key).await? else {
            return Ok(false);
        };

        let queue = QueueName::new(record.queue_name.clone()).map_err(StorageError::from)?;
        info!(queue = %queue, store, key, "restoring quarantined message");
        self.put_raw_message(&queue, record.data.clone()).await?;

        let blob_name = format!("{store}/{key}");
        self.config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs
                    .delete_blob(PERSISTED_MESSAGES_CONTAINER, &blob_name)
            })
            .await?;
        Ok(true)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Abandon every in-flight payload, best-effort
    ///
    /// Callers invoke this at shutdown so undeleted messages reappear on
    /// their queues within one visibility cycle instead of waiting for the
    /// timeout.
    pub async fn close(&self) {
        let keys = self.lock_checkouts().keys();
        if keys.is_empty() {
            return;
        }

        info!(in_flight = keys.len(), "abandoning in-flight messages on shutdown");
        for key in keys {
            if let Err(error) = self.abandon_key(&key).await {
                warn!(error = %error, "failed to abandon in-flight message during shutdown");
            }
        }
    }

    /// Number of distinct payload values currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.lock_checkouts().len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock_checkouts(&self) -> MutexGuard<'_, CheckoutTable> {
        self.checkouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn payload_key<T: Serialize>(&self, message: &T) -> Result<CheckoutKey, QueueStorageError> {
        Ok(CheckoutKey::new(self.serializer.serialize(message)?))
    }

    /// Byte budget for a raw message body, derived from the queue service's
    /// advertised base64 character budget
    fn max_payload_size(&self) -> usize {
        (self.queues.max_message_size() - 1) * 3 / 4
    }

    async fn put_bytes(&self, queue: &QueueName, bytes: Bytes) -> Result<(), QueueStorageError> {
        if bytes.len() > self.max_payload_size() {
            return self.put_overflowing(queue, bytes).await;
        }
        match self.put_raw_message(queue, bytes.clone()).await {
            Err(QueueStorageError::Storage(StorageError::MessageTooLarge { .. })) => {
                self.put_overflowing(queue, bytes).await
            }
            result => result,
        }
    }

    async fn put_overflowing(
        &self,
        queue: &QueueName,
        payload: Bytes,
    ) -> Result<(), QueueStorageError> {
        let wrapper_bytes = self.store_overflow(queue, payload).await?;
        self.put_raw_message(queue, wrapper_bytes).await
    }

    /// Write the payload to the overflow container and return the serialized
    /// wrapper pointing at it
    async fn store_overflow(
        &self,
        queue: &QueueName,
        payload: Bytes,
    ) -> Result<Bytes, QueueStorageError> {
        let blob_name = format!("{}/{}", queue, Uuid::new_v4());
        debug!(
            queue = %queue,
            blob = %blob_name,
            size = payload.len(),
            "storing oversize payload in overflow container"
        );
        self.config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs
                    .put_blob(OVERFLOWING_MESSAGES_CONTAINER, &blob_name, payload.clone())
            })
            .await?;

        let wrapper = MessageWrapper {
            container_name: OVERFLOWING_MESSAGES_CONTAINER.to_string(),
            blob_name,
        };
        Ok(self.serializer.serialize(&wrapper)?)
    }

    /// Add raw bytes to the queue, creating the queue lazily when it does
    /// not exist and waiting out its instantiation window
    async fn put_raw_message(
        &self,
        queue: &QueueName,
        bytes: Bytes,
    ) -> Result<(), QueueStorageError> {
        let put = || self.queues.put_message(queue, bytes.clone());

        match self
            .config
            .transient_retry
            .run(StorageError::is_transient, put)
            .await
        {
            Err(error) if error.is_not_found() => {
                debug!(queue = %queue, "queue missing on put; creating it");
                self.config
                    .transient_retry
                    .run(StorageError::is_transient, || {
                        self.queues.create_queue(queue)
                    })
                    .await?;
                self.config
                    .instantiation_retry
                    .run(
                        |error: &StorageError| error.is_transient() || error.is_not_found(),
                        put,
                    )
                    .await?;
                Ok(())
            }
            result => Ok(result?),
        }
    }

    /// Delete a raw message, tolerating receipts that already expired or
    /// queues that vanished
    async fn delete_raw_message(
        &self,
        queue: &QueueName,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueStorageError> {
        match self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.queues.delete_message(queue, receipt)
            })
            .await
        {
            Err(error) if error.is_not_found() => {
                debug!(queue = %queue, receipt = %receipt, "raw message already gone");
                Ok(())
            }
            result => Ok(result?),
        }
    }

    async fn delete_key(&self, key: &CheckoutKey) -> Result<bool, QueueStorageError> {
        let Some(view) = self.lock_checkouts().peek(key) else {
            return Ok(false);
        };

        if view.is_overflowing {
            match self.serializer.deserialize::<MessageWrapper>(&view.message.body) {
                Ok(wrapper) => self.delete_overflow_blob(&wrapper).await?,
                Err(error) => warn!(
                    queue = %view.queue,
                    error = %error,
                    "wrapper bytes no longer decode; overflow blob left orphaned"
                ),
            }
        }

        self.delete_raw_message(&view.queue, &view.message.receipt)
            .await?;
        self.lock_checkouts().check_in(key);
        Ok(true)
    }

    async fn abandon_key(&self, key: &CheckoutKey) -> Result<bool, QueueStorageError> {
        let Some(view) = self.lock_checkouts().peek(key) else {
            return Ok(false);
        };

        let envelope = MessageEnvelope {
            dequeue_count: view.dequeue_count,
            raw_message: view.message.body.clone(),
        };
        let mut bytes = self.serializer.serialize(&envelope)?;

        // The envelope adds its own weight; an enveloped payload near the
        // limit is pushed through the overflow path instead.
        if bytes.len() > self.max_payload_size() {
            let wrapper_bytes = self
                .store_overflow(&view.queue, view.message.body.clone())
                .await?;
            bytes = self.serializer.serialize(&MessageEnvelope {
                dequeue_count: view.dequeue_count,
                raw_message: wrapper_bytes,
            })?;
        }

        self.put_raw_message(&view.queue, bytes).await?;
        self.delete_raw_message(&view.queue, &view.message.receipt)
            .await?;
        self.lock_checkouts().check_in(key);
        Ok(true)
    }

    async fn delete_overflow_blob(
        &self,
        wrapper: &MessageWrapper,
    ) -> Result<(), QueueStorageError> {
        let removed = self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs
                    .delete_blob(&wrapper.container_name, &wrapper.blob_name)
            })
            .await?;
        if !removed {
            debug!(blob = %wrapper.blob_name, "overflow blob already gone");
        }
        Ok(())
    }

    async fn delete_overflow_blobs(&self, queue: &QueueName) -> Result<(), QueueStorageError> {
        let prefix = format!("{queue}/");
        let names = self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs
                    .list_blobs(OVERFLOWING_MESSAGES_CONTAINER, &prefix)
            })
            .await?;
        for name in names {
            self.config
                .transient_retry
                .run(StorageError::is_transient, || {
                    self.blobs.delete_blob(OVERFLOWING_MESSAGES_CONTAINER, &name)
                })
                .await?;
        }
        Ok(())
    }

    async fn write_persisted_record(
        &self,
        store: &str,
        record: &PersistedMessageRecord,
    ) -> Result<String, QueueStorageError> {
        let key = Uuid::new_v4().simple().to_string();
        let blob_name = format!("{store}/{key}");
        let bytes = self.serializer.serialize(record)?;
        self.config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs
                    .put_blob(PERSISTED_MESSAGES_CONTAINER, &blob_name, bytes.clone())
            })
            .await?;
        Ok(key)
    }

    async fn read_persisted_record(
        &self,
        store: &str,
        key: &str,
    ) -> Result<Option<PersistedMessageRecord>, QueueStorageError> {
        let blob_name = format!("{store}/{key}");
        let blob = self
            .config
            .transient_retry
            .run(StorageError::is_transient, || {
                self.blobs.get_blob(PERSISTED_MESSAGES_CONTAINER, &blob_name)
            })
            .await?;
        match blob {
            Some(bytes) => Ok(Some(self.serializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// A raw message that must be quarantined, recorded under the lock and
/// persisted after it is released
struct QuarantineCandidate {
    receipt: ReceiptHandle,
    body: Bytes,
    inserted_at: Timestamp,
    dequeue_count: u32,
    reason: String,
}

/// A wrapper message whose overflow blob is fetched after the checkout lock
/// is released
struct DeferredWrapper {
    wrapper: MessageWrapper,
    key: CheckoutKey,
    receipt: ReceiptHandle,
}
