// tests/common/mod.rs
#![allow(dead_code)]

use kinesis_io::test::mocks::{MockRecord, MockStreamClient};
use kinesis_io::test::TestUtils;
use kinesis_io::{MonitoringConfig, ReaderConfig, StartingPosition, StreamReader, WriterConfig};
use std::sync::Once;
use tokio::sync::mpsc;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("kinesis_io=debug".parse().unwrap()),
            )
            .with_test_writer()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });
}

pub fn reader_config(position: StartingPosition) -> ReaderConfig {
    ReaderConfig::new(TestUtils::STREAM_NAME).starting_position(position)
}

pub fn writer_config() -> WriterConfig {
    WriterConfig::new(TestUtils::STREAM_NAME)
}

pub fn monitoring_enabled() -> MonitoringConfig {
    MonitoringConfig {
        enabled: true,
        ..Default::default()
    }
}

/// `count` records whose payloads are "{prefix}{n}"
pub fn numbered_records(prefix: &str, count: usize) -> Vec<MockRecord> {
    (0..count)
        .map(|n| MockRecord::new(100 * (count - n) as i64, "pk", &format!("{}{}", prefix, n)))
        .collect()
}

/// Client with one shard per entry, holding that many numbered records
pub fn client_with_shards(record_counts: &[usize]) -> MockStreamClient {
    record_counts
        .iter()
        .enumerate()
        .fold(MockStreamClient::new(), |client, (idx, count)| {
            client.with_shard(
                &TestUtils::shard_id(idx),
                numbered_records(&format!("{}-", idx), *count),
            )
        })
}

/// Reads until one full rotation comes back empty
pub async fn read_all(
    reader: &mut StreamReader<MockStreamClient>,
) -> kinesis_io::Result<Vec<kinesis_io::Record>> {
    let mut records = Vec::new();
    while let Some(record) = reader.read().await? {
        records.push(record);
    }
    Ok(records)
}

pub fn drain_events(
    rx: &mut mpsc::Receiver<kinesis_io::StreamEvent>,
) -> Vec<kinesis_io::StreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
