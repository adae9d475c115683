//! Reading a single shard

use super::cursor::Cursor;
use crate::client::{Record, ShardPosition, StreamClient, StreamId};
use crate::error::{Result, StreamError};
use crate::monitoring::{EventSink, StreamEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Owns one shard's cursor and buffered records
///
/// Reads never wait for new data: an empty result is normal, the shard may
/// simply have nothing new, or the service may return an empty page while
/// records exist further on.
pub struct ShardReader<C: StreamClient> {
    client: Arc<C>,
    stream: StreamId,
    shard_id: String,
    cursor: Cursor,
    buffer: VecDeque<Record>,
    last_sequence_number: Option<String>,
    staleness: Option<Duration>,
    fetch_limit: Option<i32>,
    events: EventSink,
}

impl<C: StreamClient> ShardReader<C> {
    pub(crate) fn new(
        client: Arc<C>,
        stream: StreamId,
        shard_id: String,
        initial: ShardPosition,
        fetch_limit: Option<i32>,
        events: EventSink,
    ) -> Self {
        Self {
            client,
            stream,
            shard_id,
            cursor: Cursor::new(initial),
            buffer: VecDeque::new(),
            last_sequence_number: None,
            staleness: None,
            fetch_limit,
            events,
        }
    }

    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    /// Returns the oldest buffered record, fetching once if the buffer is empty
    pub async fn read(&mut self) -> Result<Option<Record>> {
        if self.buffer.is_empty() {
            self.fetch().await?;
        }

        let record = self.buffer.pop_front();
        if let Some(rec) = &record {
            trace!(
                shard_id = %self.shard_id,
                sequence = %rec.sequence_number,
                "Consumed record"
            );
            self.last_sequence_number = Some(rec.sequence_number.clone());
        }
        Ok(record)
    }

    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Sequence number of the last record returned by `read()`
    pub fn offset(&self) -> Option<&str> {
        self.last_sequence_number.as_deref()
    }

    /// How far the last fetch was behind the tip; `None` before the first fetch
    pub fn staleness(&self) -> Option<Duration> {
        self.staleness
    }

    /// True once the service reported the end of a closed shard
    pub fn is_closed(&self) -> bool {
        self.cursor.is_closed()
    }

    async fn fetch(&mut self) -> Result<()> {
        if self.cursor.is_closed() {
            return Ok(());
        }

        let iterator = match self.cursor.token() {
            Some(token) => token.to_string(),
            None => self.issue_cursor().await?,
        };

        debug!(stream = %self.stream, shard_id = %self.shard_id, "Retrieving records");
        let started = Instant::now();

        let batch = match self
            .client
            .get_records(&self.shard_id, &iterator, self.fetch_limit)
            .await
        {
            Ok(batch) => batch,
            Err(e) if e.is_expired_iterator() => {
                warn!(
                    shard_id = %self.shard_id,
                    last_sequence = ?self.last_sequence_number,
                    "Shard iterator expired, will reissue on next read"
                );
                self.cursor.expire();
                self.events.emit(StreamEvent::cursor_expired(&self.shard_id));
                return Ok(());
            }
            Err(source) => {
                return Err(StreamError::GetRecordsFailed {
                    shard_id: self.shard_id.clone(),
                    source,
                })
            }
        };

        debug!(
            stream = %self.stream,
            shard_id = %self.shard_id,
            count = batch.records.len(),
            millis_behind_latest = ?batch.millis_behind_latest,
            "Retrieved records"
        );
        self.events.emit(StreamEvent::records_fetched(
            &self.shard_id,
            batch.records.len(),
            batch.millis_behind_latest,
            started.elapsed(),
        ));

        // a completed fetch without a lag value counts as caught up, so the
        // shard never stays unmeasured
        self.staleness = match batch.millis_behind_latest {
            Some(ms) => Some(Duration::from_millis(ms.max(0) as u64)),
            None => self.staleness.or(Some(Duration::ZERO)),
        };
        self.buffer = batch.records.into();
        self.cursor.advance(batch.next_iterator);

        if self.cursor.is_closed() {
            info!(shard_id = %self.shard_id, "Shard closed");
            self.events.emit(StreamEvent::shard_closed(&self.shard_id));
        }

        Ok(())
    }

    async fn issue_cursor(&mut self) -> Result<String> {
        let position = self
            .cursor
            .reissue_position(self.last_sequence_number.as_deref());

        debug!(
            stream = %self.stream,
            shard_id = %self.shard_id,
            position = %position,
            "Retrieving shard iterator"
        );

        let token = self
            .client
            .get_shard_iterator(&self.stream, &self.shard_id, &position)
            .await
            .map_err(|source| StreamError::GetIteratorFailed {
                shard_id: self.shard_id.clone(),
                source,
            })?;

        self.events
            .emit(StreamEvent::cursor_issued(&self.shard_id, position.to_string()));
        self.cursor.issued(token.clone());
        Ok(token)
    }
}
