//! Batching stream producer
//!
//! [`StreamWriter`] validates messages at `enqueue()`, keeps them in a FIFO
//! queue and publishes them in batches bounded by record count and bytes.
//! Rejected records go back on the queue ahead of anything that was not part
//! of the attempted batch, so nothing is dropped and messages rejected
//! together keep their relative order.

mod payload;
mod queue;

pub use payload::{PartitionKey, Payload};
pub use queue::{QueuedMessage, MAX_PARTITION_KEY_BYTES, MAX_RECORD_BYTES};

use crate::client::{PutRecordEntry, PutRecordOutcome, StreamClient, StreamId};
use crate::error::{Result, StreamError};
use crate::monitoring::{EventSink, MonitoringConfig, StreamEvent};
use crate::retry::{Backoff, RetryConfig, RetryError};
use queue::RecordQueue;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Most records the service accepts in one publish call
pub const MAX_BATCH_RECORDS: usize = 500;

const MISSING_OUTCOME: &str = "no result returned for record";

/// Configuration for a [`StreamWriter`]
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Stream name or ARN, used as given
    pub stream: String,
    /// Flush from inside `enqueue()` once a queue threshold is reached
    pub auto_flush: bool,
    /// Record count limit of a single publish call
    pub max_batch_records: usize,
    /// Byte limit of a single publish call (payload plus partition key)
    pub max_batch_bytes: usize,
    /// Queue length that triggers an automatic flush
    pub flush_queue_records: usize,
    /// Queued bytes that trigger an automatic flush
    pub flush_queue_bytes: usize,
    pub monitoring: MonitoringConfig,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            stream: String::new(),
            auto_flush: true,
            max_batch_records: MAX_BATCH_RECORDS,
            max_batch_bytes: MAX_RECORD_BYTES,
            flush_queue_records: 500,
            flush_queue_bytes: 5 * 1024 * 1024,
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl WriterConfig {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.stream.is_empty() {
            return Err(StreamError::ConfigError("stream must not be empty".to_string()));
        }
        if !(1..=MAX_BATCH_RECORDS).contains(&self.max_batch_records) {
            return Err(StreamError::ConfigError(format!(
                "max_batch_records must be between 1 and {}, got {}",
                MAX_BATCH_RECORDS, self.max_batch_records
            )));
        }
        if self.max_batch_bytes < MAX_RECORD_BYTES {
            return Err(StreamError::ConfigError(format!(
                "max_batch_bytes must be at least {}, got {}",
                MAX_RECORD_BYTES, self.max_batch_bytes
            )));
        }
        if self.flush_queue_records == 0 || self.flush_queue_bytes == 0 {
            return Err(StreamError::ConfigError(
                "flush thresholds must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of the most recent publish attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Records submitted in the call
    pub attempted: usize,
    pub succeeded: usize,
    /// Distinct rejection reasons, not one entry per record
    pub failure_messages: BTreeSet<String>,
    /// The service refused the batch as a whole
    pub rejected_whole: bool,
}

impl BatchReport {
    fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Default::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

/// Queues messages and publishes them in bounded batches
///
/// Not meant for concurrent use; run one writer per producer task.
pub struct StreamWriter<C: StreamClient> {
    client: Arc<C>,
    stream: StreamId,
    config: WriterConfig,
    queue: RecordQueue,
    last_batch: BatchReport,
    events: EventSink,
}

impl<C: StreamClient> StreamWriter<C> {
    /// Validates the configuration; no service call is made
    pub fn new(
        client: C,
        config: WriterConfig,
    ) -> Result<(Self, Option<mpsc::Receiver<StreamEvent>>)> {
        config.validate()?;
        let stream = StreamId::parse(config.stream.as_str());
        let (events, monitoring_rx) = config.monitoring.channel();

        Ok((
            Self {
                client: Arc::new(client),
                stream,
                config,
                queue: RecordQueue::default(),
                last_batch: BatchReport::default(),
                events,
            },
            monitoring_rx,
        ))
    }

    /// Validates and queues a message
    ///
    /// Returns true when a queue threshold was reached. With `auto_flush` on,
    /// one flush has then already been performed.
    ///
    /// # Errors
    ///
    /// Only errors with [`StreamError::is_admission`] mean the message was
    /// refused. Any other error comes from the automatic flush: the message
    /// was already accepted and is still queued, so enqueueing it again would
    /// publish it twice.
    pub async fn enqueue(
        &mut self,
        payload: impl Into<Payload>,
        partition_key: impl Into<PartitionKey>,
    ) -> Result<bool> {
        let data = payload.into().into_bytes()?;
        let message = QueuedMessage::new(data, partition_key.into().resolve())?;
        trace!(
            partition_key = %message.entry().partition_key,
            size = message.size(),
            "Queued message"
        );
        self.queue.push(message);

        let flush_due = self.queue.len() >= self.config.flush_queue_records
            || self.queue.bytes() >= self.config.flush_queue_bytes;
        if flush_due && self.config.auto_flush {
            self.flush().await?;
        }
        Ok(flush_due)
    }

    /// Publishes one batch from the front of the queue
    ///
    /// Returns whether messages remain queued. An empty queue makes no
    /// service call and returns false.
    pub async fn flush(&mut self) -> Result<bool> {
        if self.queue.is_empty() {
            return Ok(false);
        }

        let batch = self
            .queue
            .take_batch(self.config.max_batch_records, self.config.max_batch_bytes);
        let remainder = self.queue.take_all();
        let entries: Vec<PutRecordEntry> = batch.iter().map(|m| m.entry().clone()).collect();

        debug!(
            stream = %self.stream,
            count = entries.len(),
            remaining = remainder.len(),
            "Sending batch"
        );

        let mut report = BatchReport::new(batch.len());
        let failure = match self.client.put_records(&self.stream, &entries).await {
            Ok(outcomes) => {
                let mut outcomes = outcomes.into_iter();
                for message in batch {
                    match outcomes.next() {
                        Some(PutRecordOutcome::Accepted { .. }) => report.succeeded += 1,
                        Some(PutRecordOutcome::Rejected {
                            error_code,
                            error_message,
                        }) => {
                            let reason = if error_message.is_empty() {
                                error_code
                            } else {
                                error_message
                            };
                            report.failure_messages.insert(reason);
                            self.queue.push(message);
                        }
                        None => {
                            report.failure_messages.insert(MISSING_OUTCOME.to_string());
                            self.queue.push(message);
                        }
                    }
                }

                debug!(
                    stream = %self.stream,
                    attempted = report.attempted,
                    succeeded = report.succeeded,
                    failures = ?report.failure_messages,
                    "Sent batch"
                );
                self.events.emit(StreamEvent::batch_published(
                    report.attempted,
                    report.succeeded,
                    report.failed(),
                ));
                None
            }
            Err(e) => {
                report.rejected_whole = true;
                report.failure_messages.insert(e.to_string());
                self.queue.extend(batch);
                self.events
                    .emit(StreamEvent::batch_rejected(report.attempted, e.to_string()));
                Some(e)
            }
        };

        self.queue.extend(remainder);
        self.last_batch = report;

        match failure {
            Some(e) if e.is_capacity_exceeded() => {
                warn!(
                    stream = %self.stream,
                    count = self.last_batch.attempted,
                    error = %e,
                    "Batch rejected, requeued"
                );
            }
            Some(e) => {
                error!(
                    stream = %self.stream,
                    count = self.last_batch.attempted,
                    error = %e,
                    "Batch failed, requeued"
                );
                return Err(StreamError::PublishFailed(e));
            }
            None => {}
        }

        Ok(!self.queue.is_empty())
    }

    /// Flushes until the queue is empty
    ///
    /// Waits between flushes that saw failures and gives up after
    /// `config.max_retries` of them; unsent messages stay queued.
    pub async fn drain<B: Backoff>(&mut self, config: &RetryConfig, backoff: &B) -> Result<()> {
        let mut attempt: u32 = 0;
        while self.flush().await? {
            if self.last_batch.is_clean() {
                continue;
            }

            attempt += 1;
            if let Some(max_retries) = config.max_retries {
                if attempt >= max_retries {
                    let reasons = self
                        .last_batch
                        .failure_messages
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(RetryError::MaxRetriesExceeded(attempt, reasons).into());
                }
            }

            let delay = backoff.next_delay(attempt - 1);
            debug!(
                attempt = attempt,
                queued = self.queue.len(),
                delay_ms = delay.as_millis() as u64,
                "Retrying flush after failures"
            );
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    pub fn last_batch(&self) -> &BatchReport {
        &self.last_batch
    }

    pub fn last_batch_size(&self) -> usize {
        self.last_batch.attempted
    }

    pub fn last_batch_success_count(&self) -> usize {
        self.last_batch.succeeded
    }

    pub fn last_batch_failure_messages(&self) -> &BTreeSet<String> {
        &self.last_batch.failure_messages
    }

    /// Messages waiting to be published
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queue.bytes()
    }

    /// Queued messages in publish order
    pub fn queued(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.queue.iter()
    }

    pub fn stream(&self) -> &StreamId {
        &self.stream
    }
}
