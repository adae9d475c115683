//! The writer's FIFO of messages awaiting acknowledgement

use crate::client::PutRecordEntry;
use crate::error::{Result, StreamError};
use bytes::Bytes;
use std::collections::VecDeque;

/// Largest partition key the service accepts, in UTF-8 bytes
pub const MAX_PARTITION_KEY_BYTES: usize = 256;

/// Largest single record (payload plus partition key)
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// A validated message waiting to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    entry: PutRecordEntry,
    size: usize,
}

impl QueuedMessage {
    /// Validates the size limits; nothing is queued on failure
    pub fn new(data: Bytes, partition_key: String) -> Result<Self> {
        let message_length = data.len();
        let partition_key_length = partition_key.len();
        let size = message_length + partition_key_length;

        if partition_key_length > MAX_PARTITION_KEY_BYTES {
            return Err(StreamError::PartitionKeyTooLarge {
                length: partition_key_length,
            });
        }
        if size > MAX_RECORD_BYTES {
            return Err(StreamError::MessageTooLarge {
                size,
                message_length,
                partition_key_length,
            });
        }

        Ok(Self {
            entry: PutRecordEntry {
                data,
                partition_key,
            },
            size,
        })
    }

    pub fn entry(&self) -> &PutRecordEntry {
        &self.entry
    }

    /// Payload plus partition key bytes
    pub fn size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordQueue {
    messages: VecDeque<QueuedMessage>,
    bytes: usize,
}

impl RecordQueue {
    pub(crate) fn push(&mut self, message: QueuedMessage) {
        self.bytes += message.size;
        self.messages.push_back(message);
    }

    pub(crate) fn extend(&mut self, messages: impl IntoIterator<Item = QueuedMessage>) {
        for message in messages {
            self.push(message);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.messages.iter()
    }

    /// Removes the longest prefix within both limits, leaving the rest queued
    ///
    /// At least one message is taken from a non-empty queue, so a message
    /// larger than `max_bytes` cannot wedge the queue.
    pub(crate) fn take_batch(&mut self, max_records: usize, max_bytes: usize) -> Vec<QueuedMessage> {
        let mut count = 0;
        let mut batch_bytes = 0;
        for message in &self.messages {
            if count >= max_records || (count > 0 && batch_bytes + message.size > max_bytes) {
                break;
            }
            count += 1;
            batch_bytes += message.size;
        }

        self.bytes -= batch_bytes;
        self.messages.drain(..count).collect()
    }

    /// Empties the queue, returning what it held in order
    pub(crate) fn take_all(&mut self) -> Vec<QueuedMessage> {
        self.bytes = 0;
        self.messages.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(len: usize, key: &str) -> QueuedMessage {
        QueuedMessage::new(Bytes::from(vec![b'A'; len]), key.to_string()).expect("valid message")
    }

    #[test]
    fn test_record_size_limit() {
        let key = "testmessage";
        let good = MAX_RECORD_BYTES - key.len();

        let ok = QueuedMessage::new(Bytes::from(vec![b'A'; good]), key.to_string()).unwrap();
        assert_eq!(ok.size(), MAX_RECORD_BYTES);

        let err = QueuedMessage::new(Bytes::from(vec![b'A'; good + 1]), key.to_string()).unwrap_err();
        assert!(matches!(
            err,
            StreamError::MessageTooLarge {
                size,
                message_length,
                partition_key_length: 11,
            } if size == MAX_RECORD_BYTES + 1 && message_length == good + 1
        ));
    }

    #[test]
    fn test_partition_key_limit_counts_utf8_bytes() {
        assert!(QueuedMessage::new(Bytes::from("x"), "A".repeat(256)).is_ok());
        assert!(matches!(
            QueuedMessage::new(Bytes::from("x"), "A".repeat(257)),
            Err(StreamError::PartitionKeyTooLarge { length: 257 })
        ));

        // 128 two-byte characters is exactly at the limit
        assert!(QueuedMessage::new(Bytes::from("x"), "\u{00C0}".repeat(128)).is_ok());
        let key = format!("{}B", "\u{00C0}".repeat(128));
        assert!(matches!(
            QueuedMessage::new(Bytes::from("x"), key),
            Err(StreamError::PartitionKeyTooLarge { length: 257 })
        ));
    }

    #[test]
    fn test_take_batch_by_count() {
        let mut queue = RecordQueue::default();
        queue.extend((0..7).map(|_| message(10, "k")));
        assert_eq!(queue.bytes(), 77);

        let batch = queue.take_batch(5, MAX_RECORD_BYTES);
        assert_eq!(batch.len(), 5);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.bytes(), 22);
    }

    #[test]
    fn test_take_batch_by_bytes() {
        let mut queue = RecordQueue::default();
        queue.extend([message(600, "a"), message(400, "b"), message(200, "c")]);

        let batch = queue.take_batch(500, 1000);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].entry().partition_key, "a");
        assert_eq!(queue.len(), 2);

        let batch = queue.take_batch(500, 1000);
        assert_eq!(batch.len(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.bytes(), 0);
    }

    #[test]
    fn test_take_batch_exact_fit() {
        let mut queue = RecordQueue::default();
        queue.extend([message(499, "a"), message(499, "b"), message(1, "c")]);

        let batch = queue.take_batch(500, 1000);
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 1);
    }
}
