//! Kinesis IO - multi-shard stream reading and batched stream writing
//!
//! [`StreamReader`] consumes every shard of a stream in fair rotation,
//! recovering expired shard iterators and exposing offsets for checkpointing.
//! [`StreamWriter`] queues messages and publishes them in bounded batches,
//! requeueing anything the service rejects.

pub mod client;
pub mod error;
pub mod monitoring;
pub mod reader;
pub mod retry;
pub mod writer;

// Make test utilities available for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test;

pub use client::{load_client, Record, ShardPosition, StreamClient, StreamClientError, StreamId};
pub use error::{Result, StreamError};
pub use monitoring::{MonitoringConfig, StreamEvent, StreamEventType};
pub use reader::{ReaderConfig, ShardReader, StartingPosition, StreamReader};
pub use retry::{Backoff, ExponentialBackoff, FixedBackoff, RetryConfig};
pub use writer::{BatchReport, PartitionKey, Payload, StreamWriter, WriterConfig};
