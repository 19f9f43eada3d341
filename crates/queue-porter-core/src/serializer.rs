//! Serialization seam between typed payloads and wire bytes.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;

/// Errors during payload serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("serialization failed: {detail}")]
    Encode { detail: String },

    #[error("deserialization failed: {detail}")]
    Decode { detail: String },
}

impl SerializationError {
    /// Short human-readable detail, used in quarantine reasons
    pub fn detail(&self) -> &str {
        match self {
            Self::Encode { detail } | Self::Decode { detail } => detail,
        }
    }
}

/// Encoding used for payloads, envelopes, wrappers, and persisted records
///
/// The provider relies on two properties: serialization is deterministic for
/// a given value (payload bytes double as in-flight tracking keys), and
/// deserialization of foreign bytes fails cleanly (tentative decoding drives
/// the envelope/wrapper/payload classification on the read path).
pub trait MessageSerializer: Send + Sync {
    /// Serialize a value to wire bytes
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Bytes, SerializationError>;

    /// Deserialize wire bytes as `T`
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError>;

    /// Best-effort structural projection of wire bytes, for inspection
    /// surfaces. Returns `None` when the bytes do not parse.
    fn unpack_json(&self, bytes: &[u8]) -> Option<serde_json::Value>;
}

/// JSON serializer backed by `serde_json`
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Create new JSON serializer
    pub fn new() -> Self {
        Self
    }
}

impl MessageSerializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Bytes, SerializationError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializationError::Encode {
                detail: e.to_string(),
            })
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        serde_json::from_slice(bytes).map_err(|e| SerializationError::Decode {
            detail: e.to_string(),
        })
    }

    fn unpack_json(&self, bytes: &[u8]) -> Option<serde_json::Value> {
        serde_json::from_slice(bytes).ok()
    }
}
