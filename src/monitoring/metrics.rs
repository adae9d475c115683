use super::types::{StreamEvent, StreamEventType};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, info};

/// Aggregated read metrics for a single shard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShardMetrics {
    pub fetches: u64,
    pub empty_fetches: u64,
    pub records_fetched: u64,
    pub cursors_issued: u64,
    pub cursors_expired: u64,
    pub closed: bool,
    pub millis_behind_latest: Option<i64>,
    pub fetch_time: Duration,
}

/// Aggregated publish metrics across all writer events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriterMetrics {
    pub batches: u64,
    pub rejected_batches: u64,
    pub records_attempted: u64,
    pub records_sent: u64,
    pub records_failed: u64,
}

/// Folds monitoring events into metrics
pub struct MetricsAggregator {
    shards: Arc<RwLock<HashMap<String, ShardMetrics>>>,
    writer: Arc<RwLock<WriterMetrics>>,
    window_duration: Duration,
    monitoring_rx: mpsc::Receiver<StreamEvent>,
}

impl MetricsAggregator {
    pub fn new(window_duration: Duration, monitoring_rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self {
            shards: Arc::new(RwLock::new(HashMap::new())),
            writer: Arc::new(RwLock::new(WriterMetrics::default())),
            window_duration,
            monitoring_rx,
        }
    }

    /// Consumes events until every sender is dropped, logging metrics each window
    pub async fn run(mut self) {
        let mut ticker = interval(self.window_duration);

        loop {
            tokio::select! {
                event = self.monitoring_rx.recv() => match event {
                    Some(event) => self.process_event(event).await,
                    None => break,
                },
                _ = ticker.tick() => self.emit_metrics().await,
            }
        }

        self.emit_metrics().await;
        debug!("Monitoring channel closed, metrics aggregator stopping");
    }

    /// Drains whatever is currently queued without waiting for more
    pub async fn drain_pending(&mut self) {
        while let Ok(event) = self.monitoring_rx.try_recv() {
            self.process_event(event).await;
        }
    }

    pub async fn process_event(&self, event: StreamEvent) {
        let Some(shard_id) = event.shard_id else {
            let mut writer = self.writer.write().await;
            match event.event_type {
                StreamEventType::BatchPublished {
                    attempted,
                    succeeded,
                    failed,
                } => {
                    writer.batches += 1;
                    writer.records_attempted += attempted as u64;
                    writer.records_sent += succeeded as u64;
                    writer.records_failed += failed as u64;
                }
                StreamEventType::BatchRejected { attempted, .. } => {
                    writer.batches += 1;
                    writer.rejected_batches += 1;
                    writer.records_attempted += attempted as u64;
                    writer.records_failed += attempted as u64;
                }
                _ => {}
            }
            return;
        };

        let mut shards = self.shards.write().await;
        let metrics = shards.entry(shard_id).or_default();
        match event.event_type {
            StreamEventType::CursorIssued { .. } => metrics.cursors_issued += 1,
            StreamEventType::CursorExpired => metrics.cursors_expired += 1,
            StreamEventType::ShardClosed => metrics.closed = true,
            StreamEventType::RecordsFetched {
                count,
                millis_behind_latest,
                duration,
            } => {
                metrics.fetches += 1;
                if count == 0 {
                    metrics.empty_fetches += 1;
                }
                metrics.records_fetched += count as u64;
                metrics.fetch_time += duration;
                if millis_behind_latest.is_some() {
                    metrics.millis_behind_latest = millis_behind_latest;
                }
            }
            _ => {}
        }
    }

    pub async fn shard_metrics(&self, shard_id: &str) -> Option<ShardMetrics> {
        self.shards.read().await.get(shard_id).cloned()
    }

    pub async fn writer_metrics(&self) -> WriterMetrics {
        self.writer.read().await.clone()
    }

    async fn emit_metrics(&self) {
        for (shard_id, metrics) in self.shards.read().await.iter() {
            info!(
                shard_id = %shard_id,
                fetches = metrics.fetches,
                empty_fetches = metrics.empty_fetches,
                records = metrics.records_fetched,
                cursors_expired = metrics.cursors_expired,
                millis_behind_latest = ?metrics.millis_behind_latest,
                closed = metrics.closed,
                "Shard metrics"
            );
        }

        let writer = self.writer.read().await;
        if writer.batches > 0 {
            info!(
                batches = writer.batches,
                rejected_batches = writer.rejected_batches,
                sent = writer.records_sent,
                failed = writer.records_failed,
                "Writer metrics"
            );
        }
    }
}
