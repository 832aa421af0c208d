//! Error types for offset bookkeeping.

use std::fmt;

use drover_core::{Offset, Timestamp, TopicPartition};
use thiserror::Error;

/// Classifies why the ledger rejected an offset transition.
///
/// The variants mirror the consumed-then-processed lifecycle: a transition is
/// rejected when it would repeat a step or skip one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadOffsetKind {
    /// The offset is already tracked as consumed.
    AlreadyConsumed,
    /// The offset was never marked consumed.
    NotConsumed,
    /// The offset already completed processing.
    AlreadyProcessed,
}

impl fmt::Display for BadOffsetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::AlreadyConsumed => "was consumed before",
            Self::NotConsumed => "was not consumed before",
            Self::AlreadyProcessed => "was processed before",
        };
        f.write_str(reason)
    }
}

/// Errors that can occur during offset bookkeeping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OffsetsError {
    /// An offset transition violated the consumed-then-processed lifecycle.
    #[error("offset {offset} for partition {partition} {kind}")]
    BadOffset {
        /// The partition whose ledger rejected the transition.
        partition: TopicPartition,
        /// The offset that was rejected.
        offset: Offset,
        /// Why the transition was rejected.
        kind: BadOffsetKind,
    },

    /// A consumed offset has been awaiting processing since before the
    /// caller's staleness cutoff, blocking the commit point.
    #[error("offset {offset} for partition {partition} exceeded processing timeout")]
    ProcessingTimeout {
        /// The partition whose commit scan is blocked.
        partition: TopicPartition,
        /// The oldest offset still awaiting processing.
        offset: Offset,
        /// When the blocking offset was consumed.
        consumed_at: Timestamp,
    },
}

/// Result type for offset bookkeeping operations.
pub type OffsetsResult<T> = std::result::Result<T, OffsetsError>;
