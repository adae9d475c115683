//! Normalizing message payloads and partition keys at the enqueue boundary

use crate::error::Result;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;

/// A message body before normalization to bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Bytes),
    Text(String),
    /// Structured value, written as JSON text
    Json(serde_json::Value),
}

impl Payload {
    /// Serializes any value to a JSON payload
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    pub(crate) fn into_bytes(self) -> Result<Bytes> {
        Ok(match self {
            Payload::Bytes(bytes) => bytes,
            Payload::Text(text) => Bytes::from(text),
            Payload::Json(value) => Bytes::from(serde_json::to_vec(&value)?),
        })
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Partition key supplied with a message
///
/// Non-text keys are converted to their decimal text form. An empty key is
/// treated like no key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartitionKey {
    /// Derived from the current time when the message is enqueued
    #[default]
    Auto,
    Key(String),
}

impl PartitionKey {
    pub(crate) fn resolve(self) -> String {
        match self {
            PartitionKey::Key(key) if !key.is_empty() => key,
            _ => time_derived_key(),
        }
    }
}

/// Seconds since the epoch with microsecond precision
fn time_derived_key() -> String {
    let now = Utc::now();
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

impl From<String> for PartitionKey {
    fn from(key: String) -> Self {
        PartitionKey::Key(key)
    }
}

impl From<&str> for PartitionKey {
    fn from(key: &str) -> Self {
        PartitionKey::Key(key.to_string())
    }
}

impl From<&String> for PartitionKey {
    fn from(key: &String) -> Self {
        PartitionKey::Key(key.clone())
    }
}

impl<K: Into<PartitionKey>> From<Option<K>> for PartitionKey {
    fn from(key: Option<K>) -> Self {
        key.map_or(PartitionKey::Auto, Into::into)
    }
}

macro_rules! numeric_partition_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PartitionKey {
                fn from(key: $t) -> Self {
                    PartitionKey::Key(key.to_string())
                }
            }
        )*
    };
}

numeric_partition_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
