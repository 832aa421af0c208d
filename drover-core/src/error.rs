//! Error types for Drover core operations.

use std::fmt;

use crate::types::Offset;

/// The result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A range-compaction input was not strictly increasing.
    OutOfOrderInput {
        /// The last offset accepted from the sequence.
        prev: Offset,
        /// The offending offset that did not increase past it.
        next: Offset,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrderInput { prev, next } => {
                write!(f, "out-of-order input: offset {next} after {prev}")
            }
        }
    }
}

impl std::error::Error for Error {}
