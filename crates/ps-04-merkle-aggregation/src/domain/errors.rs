//! Aggregation errors.

use thiserror::Error;

/// Merkle aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Aggregation was called with zero proofs. Caller bug.
    #[error("Cannot aggregate an empty batch")]
    EmptyBatch,

    /// Requested leaf index does not exist.
    #[error("Leaf index {index} out of range for batch of {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of leaves
        len: usize,
    },
}
