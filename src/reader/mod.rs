//! Multi-shard stream consumption
//!
//! [`StreamReader`] resolves a stream once, creates a [`ShardReader`] per
//! shard, and hands out records one at a time:
//!
//! - Records are drained from the most recently read shard while it still has
//!   buffered data, so each fetch is used fully.
//! - Otherwise shards are visited round-robin starting after the last one
//!   read, and `None` is only returned after every shard was tried once.
//! - Expired shard iterators are recovered inside the shard reader and never
//!   surface as errors.
//!
//! Ordering is per shard only. Delivery is at-least-once when resuming from
//! [`StreamReader::offsets`].

mod cursor;
mod shard;

pub use shard::ShardReader;

use crate::client::{Record, ShardPosition, StreamClient, StreamId};
use crate::error::{Result, StreamError};
use crate::monitoring::{MonitoringConfig, StreamEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Where each shard reader starts
#[derive(Debug, Clone, Default)]
pub enum StartingPosition {
    /// Oldest retained record of every shard
    TrimHorizon,
    /// Only records written after the reader was created
    #[default]
    Latest,
    /// First record at or after the given time
    AtTimestamp(DateTime<Utc>),
    /// Shard id to sequence number, as returned by [`StreamReader::offsets`];
    /// reading resumes after each sequence number. Shards without an entry
    /// start at the trim horizon.
    FromOffsets(HashMap<String, String>),
}

impl StartingPosition {
    fn for_shard(&self, shard_id: &str) -> ShardPosition {
        match self {
            StartingPosition::TrimHorizon => ShardPosition::TrimHorizon,
            StartingPosition::Latest => ShardPosition::Latest,
            StartingPosition::AtTimestamp(ts) => ShardPosition::AtTimestamp(*ts),
            StartingPosition::FromOffsets(offsets) => match offsets.get(shard_id) {
                Some(seq) => ShardPosition::AfterSequenceNumber(seq.clone()),
                None => {
                    info!(shard_id = %shard_id, "No offset for shard, starting at trim horizon");
                    ShardPosition::TrimHorizon
                }
            },
        }
    }
}

/// Configuration for a [`StreamReader`]
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// Stream name or ARN
    pub stream: String,
    pub starting_position: StartingPosition,
    /// Maximum records per fetch (service default when `None`)
    pub fetch_limit: Option<i32>,
    pub monitoring: MonitoringConfig,
}

impl ReaderConfig {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Default::default()
        }
    }

    pub fn starting_position(mut self, position: StartingPosition) -> Self {
        self.starting_position = position;
        self
    }

    pub fn fetch_limit(mut self, limit: i32) -> Self {
        self.fetch_limit = Some(limit);
        self
    }
}

/// Reads every shard of a stream in fair rotation
///
/// Not meant for concurrent use; run one reader per consumer task.
pub struct StreamReader<C: StreamClient> {
    stream: StreamId,
    stream_name: String,
    shards: Vec<ShardReader<C>>,
    current: Option<usize>,
}

impl<C: StreamClient> StreamReader<C> {
    /// Resolves the stream and its shards
    ///
    /// Fails if the stream cannot be described, is not in a readable state,
    /// or its shards cannot be listed. Returns the monitoring receiver when
    /// monitoring is enabled.
    pub async fn new(
        client: C,
        config: ReaderConfig,
    ) -> Result<(Self, Option<mpsc::Receiver<StreamEvent>>)> {
        let client = Arc::new(client);
        let requested = StreamId::parse(config.stream.as_str());
        let (events, monitoring_rx) = config.monitoring.channel();

        debug!(stream = %requested, "Verifying stream");
        let description = client.describe_stream(&requested).await.map_err(|source| {
            StreamError::DescribeStreamFailed {
                stream: requested.to_string(),
                source,
            }
        })?;

        if !description.status.is_servable() {
            return Err(StreamError::StreamNotActive {
                stream: requested.name().to_string(),
                status: description.status.to_string(),
            });
        }

        // every later call addresses the stream by ARN
        let stream = StreamId::Arn(description.arn);

        debug!(stream = %stream, "Retrieving shards");
        let shard_ids = client
            .list_shards(&stream)
            .await
            .map_err(|source| StreamError::ListShardsFailed {
                stream: stream.to_string(),
                source,
            })?;

        let shards = shard_ids
            .into_iter()
            .map(|shard_id| {
                let initial = config.starting_position.for_shard(&shard_id);
                ShardReader::new(
                    client.clone(),
                    stream.clone(),
                    shard_id,
                    initial,
                    config.fetch_limit,
                    events.clone(),
                )
            })
            .collect::<Vec<_>>();

        info!(
            stream = %description.name,
            shards = shards.len(),
            "Stream reader ready"
        );

        Ok((
            Self {
                stream,
                stream_name: description.name,
                shards,
                current: None,
            },
            monitoring_rx,
        ))
    }

    /// Returns the next available record, or `None` after one full rotation
    /// found nothing
    pub async fn read(&mut self) -> Result<Option<Record>> {
        if let Some(idx) = self.current {
            if self.shards[idx].has_buffered() {
                return self.shards[idx].read().await;
            }
        }

        let shard_count = self.shards.len();
        let start = self.current.map_or(0, |idx| idx + 1);
        for step in 0..shard_count {
            let idx = (start + step) % shard_count;
            self.current = Some(idx);
            if let Some(record) = self.shards[idx].read().await? {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    /// Last consumed sequence number per shard, for checkpointing
    ///
    /// Shards that have not returned a record yet are omitted.
    pub fn offsets(&self) -> HashMap<String, String> {
        self.shards
            .iter()
            .filter_map(|shard| {
                shard
                    .offset()
                    .map(|seq| (shard.shard_id().to_string(), seq.to_string()))
            })
            .collect()
    }

    /// Maximum staleness across shards
    ///
    /// `None` while any shard has not completed a fetch, since the true
    /// maximum is unknown until every shard has been measured.
    pub fn staleness(&self) -> Option<Duration> {
        if self.shards.is_empty() {
            return None;
        }
        self.shards
            .iter()
            .map(|shard| shard.staleness())
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    pub fn shard_staleness(&self) -> HashMap<String, Option<Duration>> {
        self.shards
            .iter()
            .map(|shard| (shard.shard_id().to_string(), shard.staleness()))
            .collect()
    }

    pub fn shard_ids(&self) -> Vec<&str> {
        self.shards.iter().map(|shard| shard.shard_id()).collect()
    }

    /// The resolved stream, always in ARN form
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}
