//! Optional monitoring events for readers and writers
//!
//! When enabled through [`MonitoringConfig`], constructors hand back the
//! receiving end of an event channel. [`MetricsAggregator`] turns that event
//! stream into per-shard and writer totals.

mod metrics;
mod types;

pub use metrics::{MetricsAggregator, ShardMetrics, WriterMetrics};
pub use types::{MonitoringConfig, StreamEvent, StreamEventType};

pub(crate) use types::EventSink;
