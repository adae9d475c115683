//! Error types for the stream reader and writer

use crate::client::StreamClientError;
use crate::retry::RetryError;
use thiserror::Error;

/// Main error type for reader and writer operations
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream {stream} is not active: status {status}")]
    StreamNotActive { stream: String, status: String },

    #[error("Failed to describe stream {stream}: {source}")]
    DescribeStreamFailed {
        stream: String,
        #[source]
        source: StreamClientError,
    },

    #[error("Failed to list shards for {stream}: {source}")]
    ListShardsFailed {
        stream: String,
        #[source]
        source: StreamClientError,
    },

    #[error("Failed to get iterator for shard {shard_id}: {source}")]
    GetIteratorFailed {
        shard_id: String,
        #[source]
        source: StreamClientError,
    },

    #[error("Failed to get records from shard {shard_id}: {source}")]
    GetRecordsFailed {
        shard_id: String,
        #[source]
        source: StreamClientError,
    },

    #[error("Failed to publish batch: {0}")]
    PublishFailed(#[source] StreamClientError),

    #[error("partition key too large: {length}")]
    PartitionKeyTooLarge { length: usize },

    #[error(
        "message too large: {size} (base message length = {message_length}, \
         partition key length = {partition_key_length})"
    )]
    MessageTooLarge {
        size: usize,
        message_length: usize,
        partition_key_length: usize,
    },

    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Retry(#[from] RetryError),
}

impl StreamError {
    /// True for errors raised by `enqueue()` admission checks
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            StreamError::PartitionKeyTooLarge { .. } | StreamError::MessageTooLarge { .. }
        )
    }
}

/// Result type for reader and writer operations
pub type Result<T> = std::result::Result<T, StreamError>;
