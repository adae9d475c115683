//! The stream client capability consumed by the reader and writer
//!
//! [`StreamClient`] is the only seam between this crate and the service. It is
//! implemented for [`aws_sdk_kinesis::Client`] in [`kinesis`], and by the
//! in-memory mock in [`crate::test::mocks`].

pub mod kinesis;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

pub use kinesis::load_client;

/// Errors reported by a [`StreamClient`]
///
/// Cursor expiry is its own variant so the shard reader can recover from it
/// without string matching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamClientError {
    #[error("Shard iterator expired")]
    ExpiredIterator,

    #[error("Throughput exceeded: {0}")]
    ThroughputExceeded(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("KMS error: {0}")]
    Kms(String),

    #[error("{0}")]
    Other(String),
}

impl StreamClientError {
    pub fn is_expired_iterator(&self) -> bool {
        matches!(self, StreamClientError::ExpiredIterator)
    }

    /// Whole-request rejections that are expected to clear on their own
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, StreamClientError::ThroughputExceeded(_))
    }
}

/// How a stream is addressed in service calls
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamId {
    Name(String),
    Arn(String),
}

impl StreamId {
    /// Parses a stream reference; anything starting with `arn:` is an ARN
    pub fn parse(stream: impl Into<String>) -> Self {
        let stream = stream.into();
        if stream.starts_with("arn:") {
            StreamId::Arn(stream)
        } else {
            StreamId::Name(stream)
        }
    }

    /// The bare stream name, for logging
    pub fn name(&self) -> &str {
        match self {
            StreamId::Name(name) => name,
            StreamId::Arn(arn) => arn.rsplit([':', '/']).next().unwrap_or(arn),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamId::Name(name) => f.write_str(name),
            StreamId::Arn(arn) => f.write_str(arn),
        }
    }
}

impl From<&str> for StreamId {
    fn from(stream: &str) -> Self {
        StreamId::parse(stream)
    }
}

impl From<String> for StreamId {
    fn from(stream: String) -> Self {
        StreamId::parse(stream)
    }
}

/// Lifecycle status of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Creating,
    Deleting,
    Active,
    Updating,
    Unknown(String),
}

impl StreamStatus {
    /// Whether shards can be listed and read in this state
    pub fn is_servable(&self) -> bool {
        matches!(self, StreamStatus::Active | StreamStatus::Updating)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StreamStatus::Creating => "CREATING",
            StreamStatus::Deleting => "DELETING",
            StreamStatus::Active => "ACTIVE",
            StreamStatus::Updating => "UPDATING",
            StreamStatus::Unknown(status) => status,
        }
    }
}

impl From<&str> for StreamStatus {
    fn from(status: &str) -> Self {
        match status {
            "CREATING" => StreamStatus::Creating,
            "DELETING" => StreamStatus::Deleting,
            "ACTIVE" => StreamStatus::Active,
            "UPDATING" => StreamStatus::Updating,
            other => StreamStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary returned when resolving a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescription {
    pub name: String,
    pub arn: String,
    pub status: StreamStatus,
}

/// Where a new shard iterator should point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardPosition {
    /// Oldest record still retained by the shard
    TrimHorizon,
    /// Just past the newest record at the time the iterator is issued
    Latest,
    /// Immediately after the given sequence number
    AfterSequenceNumber(String),
    /// First record at or after the given arrival time
    AtTimestamp(DateTime<Utc>),
}

impl fmt::Display for ShardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardPosition::TrimHorizon => f.write_str("TRIM_HORIZON"),
            ShardPosition::Latest => f.write_str("LATEST"),
            ShardPosition::AfterSequenceNumber(seq) => write!(f, "AFTER_SEQUENCE_NUMBER {}", seq),
            ShardPosition::AtTimestamp(ts) => write!(f, "AT_TIMESTAMP {}", ts.to_rfc3339()),
        }
    }
}

/// A record retrieved from a shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub shard_id: String,
    pub sequence_number: String,
    pub arrival_time: Option<DateTime<Utc>>,
    pub partition_key: String,
    pub data: Bytes,
}

/// One page of records returned by [`StreamClient::get_records`]
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    /// `None` once the shard has been closed and fully read
    pub next_iterator: Option<String>,
    pub millis_behind_latest: Option<i64>,
}

/// A record submitted to [`StreamClient::put_records`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecordEntry {
    pub data: Bytes,
    pub partition_key: String,
}

/// Per-record outcome of a publish call, in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutRecordOutcome {
    Accepted {
        shard_id: String,
        sequence_number: String,
    },
    Rejected {
        error_code: String,
        error_message: String,
    },
}

impl PutRecordOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PutRecordOutcome::Accepted { .. })
    }
}

#[async_trait]
pub trait StreamClient: Send + Sync {
    async fn describe_stream(
        &self,
        stream: &StreamId,
    ) -> Result<StreamDescription, StreamClientError>;

    /// Lists every shard id of the stream, following pagination
    async fn list_shards(&self, stream: &StreamId) -> Result<Vec<String>, StreamClientError>;

    async fn get_shard_iterator(
        &self,
        stream: &StreamId,
        shard_id: &str,
        position: &ShardPosition,
    ) -> Result<String, StreamClientError>;

    /// Fetches one page of records; `shard_id` only labels the returned records
    async fn get_records(
        &self,
        shard_id: &str,
        iterator: &str,
        limit: Option<i32>,
    ) -> Result<RecordBatch, StreamClientError>;

    /// Publishes a batch; `Err` means the whole batch was rejected
    async fn put_records(
        &self,
        stream: &StreamId,
        entries: &[PutRecordEntry],
    ) -> Result<Vec<PutRecordOutcome>, StreamClientError>;
}
