//! Message and identifier types shared by the queue and blob services.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Validated queue name that follows storage naming conventions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 63 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-63 characters".to_string(),
            });
        }

        // Storage queue names: lowercase alphanumerics and hyphens only
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only lowercase ASCII alphanumerics and hyphens allowed".to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Opaque token identifying one delivery of a message.
///
/// A receipt is valid only until the message is deleted or its visibility
/// timeout expires; afterwards delete attempts fail with
/// [`StorageError::MessageNotFound`](crate::error::StorageError::MessageNotFound).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create receipt handle from an opaque token
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// Generate a fresh random receipt
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get receipt token as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Elapsed time since this timestamp
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// A message handed out by [`QueueService::get_messages`](crate::queue_service::QueueService::get_messages)
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Receipt for this delivery, required to delete the message
    pub receipt: ReceiptHandle,

    /// Raw message body
    pub body: Bytes,

    /// How many times the service has handed this message out, including
    /// this delivery. Resets when the message is re-put.
    pub dequeue_count: u32,

    /// When the message was added to the queue
    pub inserted_at: Timestamp,
}

/// A message observed by [`QueueService::peek_message`](crate::queue_service::QueueService::peek_message)
/// without dequeuing it. Peeking yields no receipt.
#[derive(Debug, Clone)]
pub struct PeekedMessage {
    /// Raw message body
    pub body: Bytes,

    /// Dequeue count at the time of the peek
    pub dequeue_count: u32,

    /// When the message was added to the queue
    pub inserted_at: Timestamp,
}
