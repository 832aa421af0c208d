//! Closed offset ranges, compaction, and lazy per-offset iteration.
//!
//! The tracker's public contract is defined in terms of closed ranges: the
//! fetch layer hands over batches as `[lo, hi]` intervals, and bookkeeping
//! expands them offset by offset. Ranges can be large, so expansion is a lazy
//! iterator rather than an eagerly-allocated collection.

use std::iter::FusedIterator;
use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::types::Offset;

/// An immutable closed interval of offsets, inclusive on both ends.
///
/// A range of a single offset has `lower == upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRange {
    lower: Offset,
    upper: Offset,
}

impl ClosedRange {
    /// Creates the range `[lower, upper]`.
    ///
    /// # Panics
    ///
    /// Panics if `lower > upper`.
    #[must_use]
    pub fn new(lower: Offset, upper: Offset) -> Self {
        // TigerStyle: Assert preconditions.
        assert!(
            lower.get() <= upper.get(),
            "lower ({}) must be <= upper ({})",
            lower.get(),
            upper.get()
        );
        Self { lower, upper }
    }

    /// Creates the single-offset range `[offset, offset]`.
    ///
    /// This is the normal form when a caller supplies one offset rather than
    /// a pre-batched range.
    #[must_use]
    pub const fn single(offset: Offset) -> Self {
        Self {
            lower: offset,
            upper: offset,
        }
    }

    /// Returns the inclusive lower endpoint.
    #[must_use]
    pub const fn lower(self) -> Offset {
        self.lower
    }

    /// Returns the inclusive upper endpoint.
    #[must_use]
    pub const fn upper(self) -> Offset {
        self.upper
    }

    /// Returns true if the given offset lies within the range.
    #[must_use]
    pub const fn contains(self, offset: Offset) -> bool {
        offset.get() >= self.lower.get() && offset.get() <= self.upper.get()
    }

    /// Returns the number of offsets covered by the range.
    #[must_use]
    pub const fn count(self) -> u64 {
        self.upper.get() - self.lower.get() + 1
    }

    /// Returns a lazy iterator over the offsets of the range, ascending.
    ///
    /// The iterator is double-ended, so `.rev()` yields the offsets
    /// descending. Each call returns a fresh iterator; nothing is
    /// materialized.
    #[must_use]
    pub const fn offsets(self) -> RangeOffsets {
        RangeOffsets {
            inner: self.lower.get()..=self.upper.get(),
        }
    }
}

/// Lazy iterator over the offsets of a [`ClosedRange`].
///
/// `size_hint` is exact, so adapters collecting from it can preallocate.
#[derive(Debug, Clone)]
pub struct RangeOffsets {
    inner: RangeInclusive<u64>,
}

impl Iterator for RangeOffsets {
    type Item = Offset;

    fn next(&mut self) -> Option<Offset> {
        self.inner.next().map(Offset::new)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for RangeOffsets {
    fn next_back(&mut self) -> Option<Offset> {
        self.inner.next_back().map(Offset::new)
    }
}

impl FusedIterator for RangeOffsets {}

/// Compacts a strictly increasing offset sequence into maximal closed ranges.
///
/// Consecutive input offsets merge into one range; a gap starts a new range.
/// The output is ordered and minimal: no two adjacent ranges are mergeable.
/// Empty input yields an empty list.
///
/// # Errors
///
/// Returns [`Error::OutOfOrderInput`] the moment an offset is not strictly
/// greater than its predecessor.
pub fn compact_ranges<I>(offsets: I) -> Result<Vec<ClosedRange>>
where
    I: IntoIterator<Item = Offset>,
{
    let mut ranges = Vec::new();
    let mut current: Option<(Offset, Offset)> = None;

    for offset in offsets {
        match current {
            None => current = Some((offset, offset)),
            Some((lower, upper)) => {
                if offset.get() <= upper.get() {
                    return Err(Error::OutOfOrderInput {
                        prev: upper,
                        next: offset,
                    });
                }
                if offset.get() - upper.get() == 1 {
                    current = Some((lower, offset));
                } else {
                    ranges.push(ClosedRange::new(lower, upper));
                    current = Some((offset, offset));
                }
            }
        }
    }

    if let Some((lower, upper)) = current {
        ranges.push(ClosedRange::new(lower, upper));
    }

    Ok(ranges)
}
