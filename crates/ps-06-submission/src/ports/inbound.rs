//! # Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use shared_types::{LedgerReference, SignedProof};

use crate::domain::{BatchReceipt, DrainReport, RefreshReport, SubmissionError};

/// Submission orchestrator API.
#[async_trait]
pub trait SubmissionApi: Send + Sync {
    /// Send one proof, retrying network failures with backoff.
    ///
    /// The queue record is marked `Failed` after every failed attempt and
    /// `Submitted` on the first success. A proof already `Submitted` or
    /// `Confirmed` returns its existing reference without a transport call.
    async fn submit_one(&self, proof: &SignedProof) -> Result<LedgerReference, SubmissionError>;

    /// Commit `proofs` as one Merkle root.
    ///
    /// All or nothing: if the transport call fails, no record changes state.
    async fn submit_batch(&self, proofs: &[SignedProof]) -> Result<BatchReceipt, SubmissionError>;

    /// Send up to `batch_size` submittable records, oldest first: a single
    /// record goes through `submit_one`, more through `submit_batch`.
    ///
    /// Transport failures are recorded in the report, not returned.
    async fn drain_pending(&self, batch_size: usize) -> Result<DrainReport, SubmissionError>;

    /// Poll the ledger for every `Submitted` record and move it to
    /// `Confirmed` or `Failed`.
    async fn refresh_statuses(&self) -> Result<RefreshReport, SubmissionError>;
}
