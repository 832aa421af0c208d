//! Offset bookkeeping for Drover.
//!
//! This crate tracks, per partition, which records have been handed to
//! worker threads and which have finished processing, and computes the
//! offset that is safe to commit back to the broker when workers complete
//! out of order.
//!
//! # Overview
//!
//! The [`OffsetsTracker`] supports the three threads that meet around a
//! partition's progress:
//!
//! - **Consumption tracking**: the fetch path records each delivered offset
//!   (or a whole batch range) the moment it is handed to a worker.
//! - **Completion tracking**: worker threads mark offsets processed in
//!   whatever order they finish.
//! - **Commit points**: the committing thread asks for the highest
//!   contiguous processed prefix per partition, commits it, and then trims
//!   the bookkeeping the commit made obsolete.
//!
//! Staleness is detected at commit time: a record that has been awaiting
//! processing since before the caller's cutoff fails the commit query with
//! [`OffsetsError::ProcessingTimeout`], signalling a stuck worker rather
//! than committing past it.
//!
//! # Example
//!
//! ```
//! use drover_core::{ClosedRange, Offset, Timestamp, TopicPartition};
//! use drover_offsets::{OffsetsResult, OffsetsTracker};
//!
//! fn main() -> OffsetsResult<()> {
//!     let tracker = OffsetsTracker::new();
//!     let partition = TopicPartition::new("events", 0);
//!     tracker.register(&[partition.clone()]);
//!
//!     // The fetch path hands a batch to workers.
//!     let batch = ClosedRange::new(Offset::new(0), Offset::new(4));
//!     tracker.add_consumed(&partition, batch, Timestamp::now())?;
//!
//!     // Workers finish in arbitrary order.
//!     for offset in [1, 0, 3] {
//!         tracker.update_processed(&partition, Offset::new(offset))?;
//!     }
//!
//!     // Offsets 0 and 1 form the processed prefix, so 2 is next to read.
//!     let commits = tracker.offsets_to_commit(&[partition.clone()], None)?;
//!     assert_eq!(commits.get(&partition), Some(&Offset::new(2)));
//!
//!     // After the broker acknowledges, drop what the commit covered.
//!     tracker.remove_committed(&commits);
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! The partition registry is a sharded concurrent map, and each partition's
//! ledger serializes its own operations behind one mutex. Calls touching
//! different partitions proceed in parallel; calls touching the same
//! partition are linearizable, so a duplicate delivery and its original race
//! to exactly one winner.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Allow these for cleaner code in this crate.
#![allow(clippy::module_name_repetitions)]

mod error;
mod ledger;
mod tracker;

// Re-export public API.
pub use error::{BadOffsetKind, OffsetsError, OffsetsResult};
pub use ledger::{LedgerEntry, OffsetStatus, PartitionLedger};
pub use tracker::{CommitMap, OffsetsTracker};
