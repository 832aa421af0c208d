//! Per-partition offset ledger.
//!
//! A [`PartitionLedger`] records where every tracked offset of one partition
//! stands in the consumed-then-processed lifecycle, ordered by offset. It is
//! the unit of locking: every operation takes the ledger's internal lock, so
//! multi-offset updates and the commit scan are atomic per partition.

use std::collections::BTreeMap;

use drover_core::{ClosedRange, Offset, Timestamp, TopicPartition};
use parking_lot::Mutex;

use crate::error::{BadOffsetKind, OffsetsError, OffsetsResult};

// ----------------------------------------------------------------------------
// Ledger Entries
// ----------------------------------------------------------------------------

/// Lifecycle stage of a tracked offset.
///
/// An offset enters the ledger as `Consumed` and advances to `Processed`
/// exactly once. There is no third stage: committed offsets leave the ledger
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetStatus {
    /// Handed to a worker; completion still pending.
    Consumed,
    /// Processing finished; the offset can be committed once every offset
    /// before it is processed too.
    Processed,
}

/// Bookkeeping for one tracked offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    status: OffsetStatus,
    consumed_at: Timestamp,
}

impl LedgerEntry {
    const fn new(consumed_at: Timestamp) -> Self {
        Self {
            status: OffsetStatus::Consumed,
            consumed_at,
        }
    }

    /// Returns the entry's lifecycle stage.
    #[must_use]
    pub const fn status(self) -> OffsetStatus {
        self.status
    }

    /// Returns when the offset was handed to a worker.
    ///
    /// The timestamp is fixed at consumption and never updated, so staleness
    /// is always measured from the original hand-off.
    #[must_use]
    pub const fn consumed_at(self) -> Timestamp {
        self.consumed_at
    }

    fn mark_processed(&mut self) {
        self.status = OffsetStatus::Processed;
    }
}

// ----------------------------------------------------------------------------
// Partition Ledger
// ----------------------------------------------------------------------------

/// Ordered consumed/processed bookkeeping for a single partition.
///
/// All methods lock internally, so a shared reference is enough to mutate
/// and concurrent callers serialize per partition.
#[derive(Debug)]
pub struct PartitionLedger {
    partition: TopicPartition,
    entries: Mutex<BTreeMap<Offset, LedgerEntry>>,
}

impl PartitionLedger {
    /// Creates an empty ledger for `partition`.
    #[must_use]
    pub fn new(partition: TopicPartition) -> Self {
        Self {
            partition,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the partition this ledger belongs to.
    #[must_use]
    pub const fn partition(&self) -> &TopicPartition {
        &self.partition
    }

    /// Returns the number of tracked offsets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no offsets are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns a copy of the bookkeeping for `offset`, if tracked.
    #[must_use]
    pub fn entry(&self, offset: Offset) -> Option<LedgerEntry> {
        self.entries.lock().get(&offset).copied()
    }

    /// Records every offset of `range` as consumed at `consumed_at`.
    ///
    /// The update is all-or-nothing: the whole range is checked for
    /// collisions under the lock before anything is inserted, so a rejected
    /// call leaves the ledger untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BadOffsetKind::AlreadyConsumed`] naming the smallest offset
    /// of `range` that is already tracked.
    pub fn add_consumed(&self, range: ClosedRange, consumed_at: Timestamp) -> OffsetsResult<()> {
        let mut entries = self.entries.lock();

        if let Some((conflict, _)) = entries.range(range.lower()..=range.upper()).next() {
            return Err(OffsetsError::BadOffset {
                partition: self.partition.clone(),
                offset: *conflict,
                kind: BadOffsetKind::AlreadyConsumed,
            });
        }

        for offset in range.offsets() {
            entries.insert(offset, LedgerEntry::new(consumed_at));
        }
        Ok(())
    }

    /// Advances `offset` from consumed to processed.
    ///
    /// # Errors
    ///
    /// Returns [`BadOffsetKind::NotConsumed`] if the offset is not tracked
    /// and [`BadOffsetKind::AlreadyProcessed`] if it already advanced.
    pub fn update_processed(&self, offset: Offset) -> OffsetsResult<()> {
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get_mut(&offset) else {
            return Err(OffsetsError::BadOffset {
                partition: self.partition.clone(),
                offset,
                kind: BadOffsetKind::NotConsumed,
            });
        };
        if entry.status() == OffsetStatus::Processed {
            return Err(OffsetsError::BadOffset {
                partition: self.partition.clone(),
                offset,
                kind: BadOffsetKind::AlreadyProcessed,
            });
        }
        entry.mark_processed();
        Ok(())
    }

    /// Computes the partition's safe commit point.
    ///
    /// Walks tracked offsets in ascending order and stops at the first one
    /// still awaiting processing. The commit point is one past the last
    /// processed offset seen before the stop, following the convention that
    /// a committed offset names the next offset to read. Untracked gaps
    /// between entries do not stop the walk; only a tracked consumed entry
    /// does.
    ///
    /// Returns `None` when nothing is committable: the ledger is empty or
    /// its first entry is still awaiting processing.
    ///
    /// # Errors
    ///
    /// Returns [`OffsetsError::ProcessingTimeout`] if the entry blocking the
    /// walk was consumed strictly before `cutoff`. The commit point is
    /// withheld in that case so the caller can surface the stall instead of
    /// silently committing short. Passing `None` disables the staleness
    /// check.
    pub fn offset_to_commit(&self, cutoff: Option<Timestamp>) -> OffsetsResult<Option<Offset>> {
        let entries = self.entries.lock();

        let mut last_processed: Option<Offset> = None;
        for (offset, entry) in entries.iter() {
            match entry.status() {
                OffsetStatus::Processed => last_processed = Some(*offset),
                OffsetStatus::Consumed => {
                    if cutoff.is_some_and(|cutoff| entry.consumed_at() < cutoff) {
                        return Err(OffsetsError::ProcessingTimeout {
                            partition: self.partition.clone(),
                            offset: *offset,
                            consumed_at: entry.consumed_at(),
                        });
                    }
                    break;
                }
            }
        }
        Ok(last_processed.map(Offset::next))
    }

    /// Discards bookkeeping for every offset strictly below `committed`.
    ///
    /// Returns the number of entries removed. Offsets at or above
    /// `committed` are untouched, so calling with a commit point obtained
    /// from [`Self::offset_to_commit`] drops exactly the processed prefix.
    pub fn remove_committed(&self, committed: Offset) -> usize {
        let mut entries = self.entries.lock();

        let retained = entries.split_off(&committed);
        let removed = entries.len();
        *entries = retained;
        removed
    }
}
