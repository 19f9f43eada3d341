//! Internal wire records carried inside raw queue messages.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;

/// Base64 transport encoding for binary fields in wire records
pub(crate) mod bytes_serde {
    use base64::{engine::general_purpose, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = general_purpose::STANDARD.encode(bytes);
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)?;
        Ok(Bytes::from(decoded))
    }
}

/// Record wrapped around a message on abandon to carry the accumulated
/// dequeue count
///
/// The primitive queue service resets its native counter whenever a message
/// is re-put, so abandon re-enqueues the original bytes inside this record.
/// On the read path the effective dequeue count of an enveloped message is
/// the native count of the current raw message plus the envelope's count.
///
/// `deny_unknown_fields` keeps the tentative decode on the read path from
/// matching payload types that merely share a field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageEnvelope {
    /// Accumulated dequeue count at the time the message was abandoned
    pub dequeue_count: u32,

    /// The wrapped message bytes: either a serialized payload or a
    /// serialized [`MessageWrapper`]
    #[serde(with = "bytes_serde")]
    pub raw_message: Bytes,
}

/// Record standing in for an oversize payload, pointing at the overflow
/// blob that holds the real bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageWrapper {
    /// Container holding the overflow blob
    pub container_name: String,

    /// Blob name, of the shape `{queue-name}/{uuid}`
    pub blob_name: String,
}
