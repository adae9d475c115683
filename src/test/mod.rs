//! Test utilities and mock implementations for the reader and writer


/// Naming helpers shared by the mock client and the tests
pub struct TestUtils;

impl TestUtils {
    pub const STREAM_NAME: &'static str = "example";

    /// Message the mock uses for per-record throttling rejections
    pub const THROTTLING_MESSAGE: &'static str = "throttled!";

    pub fn stream_arn(stream_name: &str) -> String {
        format!("arn:aws:kinesis:us-east-1:123456789012:stream/{}", stream_name)
    }

    pub fn shard_id(idx: usize) -> String {
        format!("shard-{:03}", idx)
    }

    pub fn sequence_number(offset: usize) -> String {
        format!("sequence-{:06}", offset)
    }

    pub fn decompose_sequence_number(seq: &str) -> Option<usize> {
        seq.strip_prefix("sequence-")?.parse().ok()
    }

    pub fn shard_iterator(shard_id: &str, offset: usize) -> String {
        format!("{}-{:06}", shard_id, offset)
    }

    pub fn decompose_shard_iterator(iterator: &str) -> Option<(String, usize)> {
        let (shard_id, offset) = iterator.rsplit_once('-')?;
        Some((shard_id.to_string(), offset.parse().ok()?))
    }
}

#[cfg(test)]
static INIT: std::sync::Once = std::sync::Once::new();

/// Initialize logging for unit tests
#[cfg(test)]
pub(crate) fn init_logging() {
    use tracing_subscriber::EnvFilter;

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("kinesis_io=debug".parse().unwrap()),
            )
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_round_trip() {
        assert_eq!(TestUtils::shard_id(3), "shard-003");
        assert_eq!(TestUtils::sequence_number(12), "sequence-000012");
        assert_eq!(TestUtils::decompose_sequence_number("sequence-000012"), Some(12));
        assert_eq!(
            TestUtils::decompose_shard_iterator("shard-003-000007"),
            Some(("shard-003".to_string(), 7))
        );
        assert_eq!(TestUtils::decompose_shard_iterator("garbage"), None);
    }
}
