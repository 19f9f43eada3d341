//! Quarantine records for poison messages.
//!
//! Messages that exceed their retry budget or fail every decode attempt are
//! moved out of the queue into a blob-backed store for human inspection,
//! replay, or disposal. Records are immutable once written and listable by
//! store-name prefix.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::envelope::bytes_serde;
use storage_runtime::Timestamp;

/// Durable record of one quarantined message
///
/// `data` holds the envelope-peeled wire bytes of the message: the
/// serialized payload itself, or the serialized
/// [`MessageWrapper`](crate::envelope::MessageWrapper) when the payload
/// overflowed — in which case the overflow blob is preserved alongside the
/// record and deletion/restoration must honour the indirection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMessageRecord {
    /// Queue the message was quarantined from
    pub queue_name: String,

    /// When the raw message was originally enqueued
    pub inserted_at: Timestamp,

    /// When the message was quarantined
    pub persisted_at: Timestamp,

    /// Effective dequeue count at quarantine time
    pub dequeue_count: u32,

    /// Why the message was quarantined
    pub reason: String,

    /// Envelope-peeled wire bytes
    #[serde(with = "bytes_serde")]
    pub data: Bytes,
}

/// Inspection view of a quarantined message
///
/// Returned by [`get_persisted`](crate::provider::QueueStorageProvider::get_persisted).
#[derive(Debug, Clone)]
pub struct PersistedMessage {
    /// Store the record lives in
    pub store_name: String,

    /// Record key within the store
    pub key: String,

    /// Queue the message was quarantined from
    pub queue_name: String,

    /// When the raw message was originally enqueued
    pub inserted_at: Timestamp,

    /// When the message was quarantined
    pub persisted_at: Timestamp,

    /// Effective dequeue count at quarantine time
    pub dequeue_count: u32,

    /// Why the message was quarantined
    pub reason: String,

    /// Whether the raw bytes are still restorable; for overflowed payloads
    /// this requires the overflow blob to still exist
    pub is_data_available: bool,

    /// Structural projection of the payload when the serializer is
    /// introspective and the data is available
    pub payload: Option<serde_json::Value>,
}
