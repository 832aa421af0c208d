//! Partition identity, offsets, and timestamps.
//!
//! Following `TigerStyle`: explicit types prevent bugs from mixing up an
//! offset with a count or a timestamp with a duration.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifies one partition of one topic in the source stream.
///
/// Equality and hashing are by value; the ordering is topic-then-partition so
/// collections of partitions sort deterministically in tests and logs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    /// Topic name.
    topic: String,
    /// Partition number within the topic.
    partition: u32,
}

impl TopicPartition {
    /// Creates a new topic-partition pair.
    #[must_use]
    pub fn new(topic: impl Into<String>, partition: u32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }

    /// Returns the topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the partition number.
    #[must_use]
    pub const fn partition(&self) -> u32 {
        self.partition
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// Position of a record within its partition's sequence.
///
/// Offsets are assigned monotonically by the source stream per partition; no
/// two records in the same partition share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset(u64);

impl Offset {
    /// Creates an offset from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw offset value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the next offset.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in time, in milliseconds since the Unix epoch.
///
/// Totally ordered; the basis for staleness judgments against a
/// caller-supplied cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the current time as a timestamp.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Timestamps won't overflow i64 for centuries.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_partition_display() {
        let partition = TopicPartition::new("topic", 0);
        assert_eq!(format!("{partition}"), "topic-0");

        let partition = TopicPartition::new("click-events", 12);
        assert_eq!(format!("{partition}"), "click-events-12");
    }

    #[test]
    fn test_topic_partition_equality() {
        let a = TopicPartition::new("topic", 1);
        let b = TopicPartition::new("topic", 1);
        let c = TopicPartition::new("topic", 2);
        let d = TopicPartition::new("other", 1);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_topic_partition_ordering() {
        let mut partitions = vec![
            TopicPartition::new("b", 0),
            TopicPartition::new("a", 1),
            TopicPartition::new("a", 0),
        ];
        partitions.sort();

        assert_eq!(partitions[0], TopicPartition::new("a", 0));
        assert_eq!(partitions[1], TopicPartition::new("a", 1));
        assert_eq!(partitions[2], TopicPartition::new("b", 0));
    }

    #[test]
    fn test_offset() {
        let offset = Offset::new(42);
        assert_eq!(offset.get(), 42);
        assert_eq!(offset.next().get(), 43);
        assert_eq!(format!("{offset}"), "42");
    }

    #[test]
    fn test_offset_next_saturates() {
        let offset = Offset::new(u64::MAX);
        assert_eq!(offset.next().get(), u64::MAX);
    }

    #[test]
    fn test_offset_ordering() {
        assert!(Offset::new(1) < Offset::new(2));
        assert_eq!(Offset::new(7), Offset::new(7));
    }

    #[test]
    fn test_timestamp() {
        let ts = Timestamp::from_millis(1000);
        assert_eq!(ts.as_millis(), 1000);
        assert!(ts < Timestamp::from_millis(1001));
        assert!(ts > Timestamp::from_millis(999));
    }
}
