//! Drover Core - Shared vocabulary types for the Drover workers framework.
//!
//! This crate provides the types the rest of the workspace speaks in:
//! partition identity, offsets, timestamps, and the closed-range model with
//! compaction and lazy per-offset iteration. It carries no policy - which
//! offsets are safe to commit is decided by `drover-offsets`.
//!
//! # Design Principles (TigerStyle)
//!
//! - **Strongly-typed values**: Prevent mixing up offsets with counts or times
//! - **Explicit types**: Use u32/u64/i64, not usize
//! - **No unsafe code**: Safety > Performance

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod range;
mod types;

pub use error::{Error, Result};
pub use range::{compact_ranges, ClosedRange, RangeOffsets};
pub use types::{Offset, Timestamp, TopicPartition};
