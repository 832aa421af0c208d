//! Partition registry and the public tracker facade.
//!
//! [`OffsetsTracker`] owns one [`PartitionLedger`] per registered partition
//! inside a sharded concurrent map. Lookups take a shard read lock, so
//! traffic for different partitions proceeds in parallel; only register and
//! unregister mutate the registry itself. The lock order is always registry
//! shard first, partition ledger second, and ledger operations never touch
//! the registry, so the two levels cannot deadlock.

use std::collections::HashMap;

use dashmap::DashMap;
use drover_core::{ClosedRange, Offset, Timestamp, TopicPartition};
use tracing::debug;

use crate::error::OffsetsResult;
use crate::ledger::PartitionLedger;

/// Commit points keyed by partition, as produced by
/// [`OffsetsTracker::offsets_to_commit`].
///
/// Each value is the next offset to read, one past the highest contiguous
/// processed prefix. Partitions with nothing committable are absent.
pub type CommitMap = HashMap<TopicPartition, Offset>;

/// Concurrent consumed/processed bookkeeping across partitions.
///
/// The tracker sits between three kinds of callers: the fetch path records
/// consumption, worker threads record completion in arbitrary order, and the
/// committing thread periodically asks for safe commit points and trims what
/// the broker acknowledged. Rebalance callbacks register and unregister
/// partitions around all of that.
///
/// Recording calls for partitions that are not registered return `Ok` without
/// effect. A rebalance can revoke a partition while deliveries for it are
/// still in flight; the new owner re-tracks those records, so dropping the
/// bookkeeping here is the correct outcome.
#[derive(Debug, Default)]
pub struct OffsetsTracker {
    partitions: DashMap<TopicPartition, PartitionLedger>,
}

impl OffsetsTracker {
    /// Creates a tracker with no registered partitions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
        }
    }

    /// Creates an empty ledger for each partition not yet registered.
    ///
    /// Re-registering a partition keeps its existing ledger untouched, so a
    /// spurious double-assign cannot discard in-flight bookkeeping.
    pub fn register(&self, partitions: &[TopicPartition]) {
        for partition in partitions {
            self.partitions.entry(partition.clone()).or_insert_with(|| {
                debug!(partition = %partition, "Registered partition");
                PartitionLedger::new(partition.clone())
            });
        }
    }

    /// Removes each partition's ledger, discarding all pending bookkeeping.
    ///
    /// Partitions that were never registered are skipped silently.
    pub fn unregister(&self, partitions: &[TopicPartition]) {
        for partition in partitions {
            if let Some((_, ledger)) = self.partitions.remove(partition) {
                debug!(
                    partition = %partition,
                    tracked = ledger.len(),
                    "Unregistered partition"
                );
            }
        }
    }

    /// Returns true if the partition currently has a ledger.
    #[must_use]
    pub fn is_registered(&self, partition: &TopicPartition) -> bool {
        self.partitions.contains_key(partition)
    }

    /// Returns the number of registered partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Records every offset of `range` as consumed at `consumed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`BadOffsetKind::AlreadyConsumed`] naming the smallest offset
    /// of `range` that is already tracked; the ledger is left untouched in
    /// that case.
    ///
    /// [`BadOffsetKind::AlreadyConsumed`]: crate::BadOffsetKind::AlreadyConsumed
    pub fn add_consumed(
        &self,
        partition: &TopicPartition,
        range: ClosedRange,
        consumed_at: Timestamp,
    ) -> OffsetsResult<()> {
        match self.partitions.get(partition) {
            Some(ledger) => ledger.add_consumed(range, consumed_at),
            None => Ok(()),
        }
    }

    /// Records a single offset as consumed at `consumed_at`.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_consumed`].
    pub fn add_consumed_offset(
        &self,
        partition: &TopicPartition,
        offset: Offset,
        consumed_at: Timestamp,
    ) -> OffsetsResult<()> {
        self.add_consumed(partition, ClosedRange::single(offset), consumed_at)
    }

    /// Records a single offset as consumed at the current wall clock.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_consumed`].
    pub fn add_consumed_now(
        &self,
        partition: &TopicPartition,
        offset: Offset,
    ) -> OffsetsResult<()> {
        self.add_consumed_offset(partition, offset, Timestamp::now())
    }

    /// Advances one offset from consumed to processed.
    ///
    /// # Errors
    ///
    /// Returns [`BadOffsetKind::NotConsumed`] if the offset is not tracked
    /// and [`BadOffsetKind::AlreadyProcessed`] if it already advanced.
    ///
    /// [`BadOffsetKind::NotConsumed`]: crate::BadOffsetKind::NotConsumed
    /// [`BadOffsetKind::AlreadyProcessed`]: crate::BadOffsetKind::AlreadyProcessed
    pub fn update_processed(
        &self,
        partition: &TopicPartition,
        offset: Offset,
    ) -> OffsetsResult<()> {
        match self.partitions.get(partition) {
            Some(ledger) => ledger.update_processed(offset),
            None => Ok(()),
        }
    }

    /// Computes the safe commit point for each assigned partition.
    ///
    /// Partitions without a ledger, with an empty ledger, or whose earliest
    /// tracked offset is still awaiting processing are omitted from the map,
    /// never reported with a placeholder.
    ///
    /// When `min_consumed_at` is supplied, a partition whose commit point is
    /// blocked by an entry consumed strictly before it fails the whole call:
    /// the stall has to be surfaced, not silently committed around. `None`
    /// disables the staleness check.
    ///
    /// # Errors
    ///
    /// Returns [`OffsetsError::ProcessingTimeout`] naming the blocking
    /// partition and offset.
    ///
    /// [`OffsetsError::ProcessingTimeout`]: crate::OffsetsError::ProcessingTimeout
    pub fn offsets_to_commit(
        &self,
        assigned: &[TopicPartition],
        min_consumed_at: Option<Timestamp>,
    ) -> OffsetsResult<CommitMap> {
        let mut commits = CommitMap::new();
        for partition in assigned {
            let Some(ledger) = self.partitions.get(partition) else {
                continue;
            };
            if let Some(offset) = ledger.offset_to_commit(min_consumed_at)? {
                commits.insert(partition.clone(), offset);
            }
        }
        debug!(partitions = commits.len(), "Computed offsets to commit");
        Ok(commits)
    }

    /// Discards bookkeeping made obsolete by acknowledged commits.
    ///
    /// For every partition in `commits`, entries strictly below the
    /// committed offset are removed. Partitions no longer registered are
    /// skipped.
    pub fn remove_committed(&self, commits: &CommitMap) {
        let mut removed = 0_usize;
        for (partition, committed) in commits {
            if let Some(ledger) = self.partitions.get(partition) {
                removed += ledger.remove_committed(*committed);
            }
        }
        debug!(
            partitions = commits.len(),
            removed, "Removed committed entries"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BadOffsetKind, OffsetsError};

    const TS: Timestamp = Timestamp::from_millis(100);

    fn partition(index: u32) -> TopicPartition {
        TopicPartition::new("events", index)
    }

    fn tracker(partitions: &[TopicPartition]) -> OffsetsTracker {
        let tracker = OffsetsTracker::new();
        tracker.register(partitions);
        tracker
    }

    fn consume(tracker: &OffsetsTracker, partition: &TopicPartition, lower: u64, upper: u64) {
        let range = ClosedRange::new(Offset::new(lower), Offset::new(upper));
        tracker.add_consumed(partition, range, TS).unwrap();
    }

    fn process(tracker: &OffsetsTracker, partition: &TopicPartition, offset: u64) {
        tracker.update_processed(partition, Offset::new(offset)).unwrap();
    }

    fn commits(tracker: &OffsetsTracker, assigned: &[TopicPartition]) -> CommitMap {
        tracker.offsets_to_commit(assigned, None).unwrap()
    }

    #[test]
    fn test_register_and_unregister() {
        let p0 = partition(0);
        let p1 = partition(1);
        let tracker = tracker(&[p0.clone(), p1.clone()]);

        assert_eq!(tracker.partition_count(), 2);
        assert!(tracker.is_registered(&p0));
        assert!(tracker.is_registered(&p1));

        tracker.unregister(&[p0.clone()]);
        assert_eq!(tracker.partition_count(), 1);
        assert!(!tracker.is_registered(&p0));
        assert!(tracker.is_registered(&p1));
    }

    #[test]
    fn test_register_is_idempotent() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 0, 0);

        // A second register keeps the existing ledger.
        tracker.register(&[p0.clone()]);
        process(&tracker, &p0, 0);

        let map = commits(&tracker, &[p0.clone()]);
        assert_eq!(map.get(&p0), Some(&Offset::new(1)));
    }

    #[test]
    fn test_unregister_discards_state() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 0, 5);

        tracker.unregister(&[p0.clone()]);
        tracker.register(&[p0.clone()]);

        // The fresh ledger has no memory of the earlier consumption.
        let err = tracker.update_processed(&p0, Offset::new(0)).unwrap_err();
        assert!(matches!(
            err,
            OffsetsError::BadOffset {
                kind: BadOffsetKind::NotConsumed,
                ..
            }
        ));
    }

    #[test]
    fn test_unregistered_partition_calls_are_noops() {
        let tracker = OffsetsTracker::new();
        let p0 = partition(0);

        tracker.add_consumed(&p0, ClosedRange::single(Offset::new(0)), TS).unwrap();
        tracker.update_processed(&p0, Offset::new(0)).unwrap();
        tracker.unregister(&[p0.clone()]);

        assert!(commits(&tracker, &[p0.clone()]).is_empty());

        let mut acknowledged = CommitMap::new();
        acknowledged.insert(p0, Offset::new(10));
        tracker.remove_committed(&acknowledged);
    }

    #[test]
    fn test_double_consume_is_rejected() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 3, 3);

        let err = tracker.add_consumed(&p0, ClosedRange::single(Offset::new(3)), TS).unwrap_err();
        assert_eq!(
            err,
            OffsetsError::BadOffset {
                partition: p0.clone(),
                offset: Offset::new(3),
                kind: BadOffsetKind::AlreadyConsumed,
            }
        );

        // A distinct offset is still accepted afterward.
        consume(&tracker, &p0, 4, 4);
    }

    #[test]
    fn test_commit_independent_of_processing_order() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 0, 10);
        for offset in [1, 3, 0, 5, 2, 4] {
            process(&tracker, &p0, offset);
        }

        let map = commits(&tracker, &[p0.clone()]);
        assert_eq!(map.get(&p0), Some(&Offset::new(6)));
    }

    #[test]
    fn test_commit_stops_at_gap() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 0, 6);
        for offset in [0, 1, 2, 4, 5, 6] {
            process(&tracker, &p0, offset);
        }

        let map = commits(&tracker, &[p0.clone()]);
        assert_eq!(map.get(&p0), Some(&Offset::new(3)));
    }

    #[test]
    fn test_commit_points_are_per_partition() {
        let p0 = partition(0);
        let p1 = partition(1);
        let tracker = tracker(&[p0.clone(), p1.clone()]);

        consume(&tracker, &p0, 0, 2);
        consume(&tracker, &p1, 3, 5);
        for offset in 0..=2 {
            process(&tracker, &p0, offset);
        }
        for offset in 3..=5 {
            process(&tracker, &p1, offset);
        }

        let map = commits(&tracker, &[p0.clone(), p1.clone()]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&p0), Some(&Offset::new(3)));
        assert_eq!(map.get(&p1), Some(&Offset::new(6)));
    }

    #[test]
    fn test_partition_omitted_without_processed_prefix() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 0, 2);
        process(&tracker, &p0, 1);
        process(&tracker, &p0, 2);

        // Offset 0 is still pending, so the partition must be absent rather
        // than mapped to a placeholder.
        assert!(commits(&tracker, &[p0.clone()]).is_empty());
    }

    #[test]
    fn test_timeout_fails_the_whole_query() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        for (offset, at) in [(0, 10), (1, 15), (2, 20)] {
            tracker
                .add_consumed_offset(&p0, Offset::new(offset), Timestamp::from_millis(at))
                .unwrap();
        }
        process(&tracker, &p0, 0);

        let err = tracker
            .offsets_to_commit(&[p0.clone()], Some(Timestamp::from_millis(20)))
            .unwrap_err();
        assert_eq!(
            err,
            OffsetsError::ProcessingTimeout {
                partition: p0.clone(),
                offset: Offset::new(1),
                consumed_at: Timestamp::from_millis(15),
            }
        );

        // At the blocker's own consumed_at the partition is merely blocked,
        // not stale.
        let map = tracker
            .offsets_to_commit(&[p0.clone()], Some(Timestamp::from_millis(15)))
            .unwrap();
        assert_eq!(map.get(&p0), Some(&Offset::new(1)));
    }

    #[test]
    fn test_missing_cutoff_disables_timeout() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        tracker
            .add_consumed_offset(&p0, Offset::new(0), Timestamp::from_millis(10))
            .unwrap();
        tracker
            .add_consumed_offset(&p0, Offset::new(1), Timestamp::from_millis(15))
            .unwrap();
        process(&tracker, &p0, 0);

        let map = commits(&tracker, &[p0.clone()]);
        assert_eq!(map.get(&p0), Some(&Offset::new(1)));
    }

    #[test]
    fn test_remove_committed_then_keep_tracking() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        consume(&tracker, &p0, 0, 5);
        for offset in 0..=2 {
            process(&tracker, &p0, offset);
        }

        let map = commits(&tracker, &[p0.clone()]);
        assert_eq!(map.get(&p0), Some(&Offset::new(3)));
        tracker.remove_committed(&map);

        // Entries below the commit point are gone.
        let err = tracker.update_processed(&p0, Offset::new(2)).unwrap_err();
        assert!(matches!(
            err,
            OffsetsError::BadOffset {
                kind: BadOffsetKind::NotConsumed,
                ..
            }
        ));

        // Entries at and above it still transition normally.
        for offset in 3..=5 {
            process(&tracker, &p0, offset);
        }
        let map = commits(&tracker, &[p0.clone()]);
        assert_eq!(map.get(&p0), Some(&Offset::new(6)));
    }

    #[test]
    fn test_consumed_now_uses_wall_clock() {
        let p0 = partition(0);
        let tracker = tracker(&[p0.clone()]);
        tracker.add_consumed_now(&p0, Offset::new(0)).unwrap();

        // A cutoff in the distant past cannot mark a fresh entry stale.
        let map = tracker
            .offsets_to_commit(&[p0.clone()], Some(Timestamp::from_millis(0)))
            .unwrap();
        assert!(map.is_empty());
    }
}
