//! In-flight bookkeeping: maps decoded payloads back to raw queue receipts.

use bytes::Bytes;
use std::collections::HashMap;

use storage_runtime::{QueueName, ReceiptHandle, Timestamp};

#[cfg(test)]
#[path = "checkout_tests.rs"]
mod tests;

/// Key identifying an in-flight payload by value
///
/// Built from the payload's canonical serialized bytes, so payloads with
/// value-equal content collapse to the same key regardless of how many raw
/// deliveries produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckoutKey(Bytes);

impl CheckoutKey {
    /// Create key from canonical serialized payload bytes
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// The serialized bytes backing this key
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

/// One raw delivery backing an in-flight payload
#[derive(Debug, Clone)]
pub struct CheckedOutMessage {
    /// Receipt required to delete this delivery
    pub receipt: ReceiptHandle,

    /// Envelope-peeled wire bytes of the delivery: the serialized payload,
    /// or the serialized wrapper when the payload overflowed
    pub body: Bytes,

    /// When the raw message was added to the queue
    pub inserted_at: Timestamp,
}

/// Bookkeeping for one in-flight payload value
#[derive(Debug)]
struct CheckoutEntry {
    queue: QueueName,
    /// Stack of deliveries; value-equal payloads from separate dequeues
    /// share this entry and check in one receipt at a time
    receipts: Vec<CheckedOutMessage>,
    is_overflowing: bool,
    dequeue_count: u32,
}

/// Copy of the newest delivery of an entry, taken under the lock so remote
/// I/O can run without holding it
#[derive(Debug, Clone)]
pub struct CheckoutView {
    pub queue: QueueName,
    pub message: CheckedOutMessage,
    pub is_overflowing: bool,
    pub dequeue_count: u32,
}

/// Map from payload value to raw queue receipts
///
/// Invariant: a payload is present exactly while it is in flight from the
/// caller's perspective. Entries are added on the read path and removed one
/// receipt at a time by delete, abandon, persist, or shutdown.
///
/// The table itself is not synchronized; the provider guards it with its
/// single checkout mutex and never holds that mutex across a remote call.
#[derive(Debug, Default)]
pub struct CheckoutTable {
    entries: HashMap<CheckoutKey, CheckoutEntry>,
}

impl CheckoutTable {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery under the given payload key
    ///
    /// A key that is already present gains another receipt on its stack and
    /// refreshes the recorded dequeue count.
    pub fn check_out(
        &mut self,
        key: CheckoutKey,
        message: CheckedOutMessage,
        queue: &QueueName,
        is_overflowing: bool,
        dequeue_count: u32,
    ) {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.receipts.push(message);
                entry.dequeue_count = dequeue_count;
            }
            None => {
                self.entries.insert(
                    key,
                    CheckoutEntry {
                        queue: queue.clone(),
                        receipts: vec![message],
                        is_overflowing,
                        dequeue_count,
                    },
                );
            }
        }
    }

    /// Move an entry to a new key, merging receipts if the new key already
    /// exists. Used when an overflow wrapper resolves to its real payload.
    pub fn relink(&mut self, old: &CheckoutKey, new: CheckoutKey) -> bool {
        let Some(entry) = self.entries.remove(old) else {
            return false;
        };
        match self.entries.get_mut(&new) {
            Some(existing) => {
                existing.receipts.extend(entry.receipts);
                existing.dequeue_count = entry.dequeue_count;
            }
            None => {
                self.entries.insert(new, entry);
            }
        }
        true
    }

    /// Copy out the newest delivery of an entry without removing it
    pub fn peek(&self, key: &CheckoutKey) -> Option<CheckoutView> {
        let entry = self.entries.get(key)?;
        let message = entry.receipts.last()?.clone();
        Some(CheckoutView {
            queue: entry.queue.clone(),
            message,
            is_overflowing: entry.is_overflowing,
            dequeue_count: entry.dequeue_count,
        })
    }

    /// Pop the newest receipt for the key, removing the entry once its last
    /// receipt is gone. Returns whether anything was checked in.
    pub fn check_in(&mut self, key: &CheckoutKey) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.receipts.pop();
        if entry.receipts.is_empty() {
            self.entries.remove(key);
        }
        true
    }

    /// Snapshot of all in-flight payload keys
    pub fn keys(&self) -> Vec<CheckoutKey> {
        self.entries.keys().cloned().collect()
    }

    /// Whether the key is currently checked out
    pub fn contains(&self, key: &CheckoutKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct in-flight payload values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
