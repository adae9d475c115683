use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Configuration for the monitoring system
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Whether monitoring events are emitted
    pub enabled: bool,
    /// Size of the monitoring channel buffer
    pub channel_size: usize,
    /// How often the aggregator logs metrics
    pub metrics_interval: Duration,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_size: 1000,
            metrics_interval: Duration::from_secs(60),
        }
    }
}

impl MonitoringConfig {
    /// Creates the event channel if monitoring is enabled
    pub(crate) fn channel(&self) -> (EventSink, Option<mpsc::Receiver<StreamEvent>>) {
        if self.enabled {
            let (tx, rx) = mpsc::channel(self.channel_size.max(1));
            (EventSink(Some(tx)), Some(rx))
        } else {
            (EventSink(None), None)
        }
    }
}

/// Sending half of the monitoring channel; a no-op when monitoring is off
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink(Option<mpsc::Sender<StreamEvent>>);

impl EventSink {
    /// Never waits: a full or closed channel drops the event
    pub(crate) fn emit(&self, event: StreamEvent) {
        if let Some(tx) = &self.0 {
            match tx.try_send(event) {
                Ok(()) => trace!("Sent monitoring event"),
                Err(e) => warn!(error = %e, "Failed to send monitoring event"),
            }
        }
    }
}

/// A monitoring event from a reader or writer
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub timestamp: SystemTime,
    /// Shard the event relates to; `None` for writer events
    pub shard_id: Option<String>,
    pub event_type: StreamEventType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEventType {
    CursorIssued {
        position: String,
    },
    CursorExpired,
    ShardClosed,
    RecordsFetched {
        count: usize,
        millis_behind_latest: Option<i64>,
        duration: Duration,
    },
    /// The service answered with per-record outcomes
    BatchPublished {
        attempted: usize,
        succeeded: usize,
        failed: usize,
    },
    /// The service refused the whole batch
    BatchRejected {
        attempted: usize,
        error: String,
    },
}

impl StreamEvent {
    fn shard(shard_id: &str, event_type: StreamEventType) -> Self {
        Self {
            timestamp: SystemTime::now(),
            shard_id: Some(shard_id.to_string()),
            event_type,
        }
    }

    fn writer(event_type: StreamEventType) -> Self {
        Self {
            timestamp: SystemTime::now(),
            shard_id: None,
            event_type,
        }
    }

    pub fn cursor_issued(shard_id: &str, position: String) -> Self {
        Self::shard(shard_id, StreamEventType::CursorIssued { position })
    }

    pub fn cursor_expired(shard_id: &str) -> Self {
        Self::shard(shard_id, StreamEventType::CursorExpired)
    }

    pub fn shard_closed(shard_id: &str) -> Self {
        Self::shard(shard_id, StreamEventType::ShardClosed)
    }

    pub fn records_fetched(
        shard_id: &str,
        count: usize,
        millis_behind_latest: Option<i64>,
        duration: Duration,
    ) -> Self {
        Self::shard(
            shard_id,
            StreamEventType::RecordsFetched {
                count,
                millis_behind_latest,
                duration,
            },
        )
    }

    pub fn batch_published(attempted: usize, succeeded: usize, failed: usize) -> Self {
        Self::writer(StreamEventType::BatchPublished {
            attempted,
            succeeded,
            failed,
        })
    }

    pub fn batch_rejected(attempted: usize, error: String) -> Self {
        Self::writer(StreamEventType::BatchRejected { attempted, error })
    }
}
