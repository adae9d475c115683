//! [`StreamClient`] implementation over the AWS SDK

use super::{
    PutRecordEntry, PutRecordOutcome, Record, RecordBatch, ShardPosition, StreamClient,
    StreamClientError, StreamDescription, StreamId, StreamStatus,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kinesis::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_kinesis::types::{PutRecordsRequestEntry, ShardIteratorType};
use aws_sdk_kinesis::Client;
use aws_smithy_types::Blob;
use aws_smithy_types_convert::date_time::DateTimeExt;
use bytes::Bytes;
use std::time::SystemTime;
use tracing::trace;

/// Builds a Kinesis client from the environment's credential and region chain
pub async fn load_client(region: Option<String>) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    Client::new(&loader.load().await)
}

fn classify<E, R>(err: SdkError<E, R>) -> StreamClientError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = err
        .message()
        .map(String::from)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    match err.code() {
        Some("ExpiredIteratorException") => StreamClientError::ExpiredIterator,
        Some("ProvisionedThroughputExceededException")
        | Some("LimitExceededException")
        | Some("KMSThrottlingException") => StreamClientError::ThroughputExceeded(message),
        Some("AccessDeniedException") => StreamClientError::AccessDenied(message),
        Some("InvalidArgumentException") => StreamClientError::InvalidArgument(message),
        Some("ResourceNotFoundException") => StreamClientError::ResourceNotFound(message),
        Some(code) if code.starts_with("KMS") => StreamClientError::Kms(message),
        _ => StreamClientError::Other(message),
    }
}

#[async_trait]
impl StreamClient for Client {
    async fn describe_stream(
        &self,
        stream: &StreamId,
    ) -> Result<StreamDescription, StreamClientError> {
        let req = self.describe_stream_summary();
        let req = match stream {
            StreamId::Name(name) => req.stream_name(name),
            StreamId::Arn(arn) => req.stream_arn(arn),
        };
        let response = req.send().await.map_err(classify)?;

        let summary = response.stream_description_summary().ok_or_else(|| {
            StreamClientError::Other(format!("no description returned for {}", stream))
        })?;

        Ok(StreamDescription {
            name: summary.stream_name().to_string(),
            arn: summary.stream_arn().to_string(),
            status: StreamStatus::from(summary.stream_status().as_str()),
        })
    }

    async fn list_shards(&self, stream: &StreamId) -> Result<Vec<String>, StreamClientError> {
        let mut shard_ids = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let req = self.list_shards();
            // the service rejects a stream identifier alongside a continuation token
            let req = match (&next_token, stream) {
                (Some(token), _) => req.next_token(token),
                (None, StreamId::Name(name)) => req.stream_name(name),
                (None, StreamId::Arn(arn)) => req.stream_arn(arn),
            };
            let response = req.send().await.map_err(classify)?;

            shard_ids.extend(
                response
                    .shards()
                    .iter()
                    .map(|shard| shard.shard_id().to_string()),
            );

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(shard_ids)
    }

    async fn get_shard_iterator(
        &self,
        stream: &StreamId,
        shard_id: &str,
        position: &ShardPosition,
    ) -> Result<String, StreamClientError> {
        let req = self.get_shard_iterator().shard_id(shard_id);
        let req = match stream {
            StreamId::Name(name) => req.stream_name(name),
            StreamId::Arn(arn) => req.stream_arn(arn),
        };
        let req = match position {
            ShardPosition::TrimHorizon => req.shard_iterator_type(ShardIteratorType::TrimHorizon),
            ShardPosition::Latest => req.shard_iterator_type(ShardIteratorType::Latest),
            ShardPosition::AfterSequenceNumber(seq) => req
                .shard_iterator_type(ShardIteratorType::AfterSequenceNumber)
                .starting_sequence_number(seq),
            ShardPosition::AtTimestamp(ts) => {
                let system_time: SystemTime = (*ts).into();
                req.shard_iterator_type(ShardIteratorType::AtTimestamp)
                    .timestamp(aws_smithy_types::DateTime::from(system_time))
            }
        };

        let response = req.send().await.map_err(classify)?;
        response
            .shard_iterator()
            .map(String::from)
            .ok_or_else(|| StreamClientError::Other(format!("no iterator returned for {}", shard_id)))
    }

    async fn get_records(
        &self,
        shard_id: &str,
        iterator: &str,
        limit: Option<i32>,
    ) -> Result<RecordBatch, StreamClientError> {
        let response = self
            .get_records()
            .shard_iterator(iterator)
            .set_limit(limit)
            .send()
            .await
            .map_err(classify)?;

        let records = response
            .records()
            .iter()
            .map(|record| Record {
                shard_id: shard_id.to_string(),
                sequence_number: record.sequence_number().to_string(),
                arrival_time: record
                    .approximate_arrival_timestamp()
                    .and_then(|ts| ts.to_chrono_utc().ok()),
                partition_key: record.partition_key().to_string(),
                data: Bytes::copy_from_slice(record.data().as_ref()),
            })
            .collect::<Vec<_>>();

        trace!(shard_id = %shard_id, count = records.len(), "Converted SDK records");

        Ok(RecordBatch {
            records,
            next_iterator: response.next_shard_iterator().map(String::from),
            millis_behind_latest: response.millis_behind_latest(),
        })
    }

    async fn put_records(
        &self,
        stream: &StreamId,
        entries: &[PutRecordEntry],
    ) -> Result<Vec<PutRecordOutcome>, StreamClientError> {
        let request_entries = entries
            .iter()
            .map(|entry| {
                PutRecordsRequestEntry::builder()
                    .data(Blob::new(entry.data.to_vec()))
                    .partition_key(&entry.partition_key)
                    .build()
                    .map_err(|e| StreamClientError::InvalidArgument(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let req = self.put_records().set_records(Some(request_entries));
        let req = match stream {
            StreamId::Name(name) => req.stream_name(name),
            StreamId::Arn(arn) => req.stream_arn(arn),
        };
        let response = req.send().await.map_err(classify)?;

        Ok(response
            .records()
            .iter()
            .map(|result| match result.error_code() {
                Some(code) => PutRecordOutcome::Rejected {
                    error_code: code.to_string(),
                    error_message: result.error_message().unwrap_or(code).to_string(),
                },
                None => PutRecordOutcome::Accepted {
                    shard_id: result.shard_id().unwrap_or_default().to_string(),
                    sequence_number: result.sequence_number().unwrap_or_default().to_string(),
                },
            })
            .collect())
    }
}
