//! Batch construction results.

use shared_types::SignedProof;

use crate::domain::errors::ProofError;

/// A reading `build_batch` dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedReading {
    /// Position in the input slice.
    pub index: usize,
    /// Why it was dropped.
    pub error: ProofError,
}

/// Outcome of a partial-success batch build.
#[derive(Debug, Clone, Default)]
pub struct BatchBuildReport {
    /// Proofs built, in input order.
    pub proofs: Vec<SignedProof>,
    /// Readings that failed.
    pub skipped: Vec<SkippedReading>,
}

impl BatchBuildReport {
    /// Whether every reading produced a proof.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
