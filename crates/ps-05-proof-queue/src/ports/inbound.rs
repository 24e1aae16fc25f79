//! # Inbound Ports (Driving Ports / API)

use shared_types::{
    LedgerReference, MerkleRoot, ProofDigest, SensorKind, SignedProof, Timestamp,
};

use crate::domain::{
    AppendOutcome, CompactionReport, ImportReport, QueueError, QueueStats, StoredProof,
    SubmissionState,
};

/// Durable proof queue API.
///
/// The queue is the only owner of submission state. Every write is
/// linearized; reads never fail and return empty results on storage
/// problems.
pub trait ProofQueueApi: Send + Sync {
    /// Store a proof as `Pending`. Idempotent on digest: an existing record
    /// is left exactly as it is.
    fn append(&self, proof: SignedProof) -> Result<AppendOutcome, QueueError>;

    /// Append several proofs in one atomic write.
    fn append_many(&self, proofs: Vec<SignedProof>) -> Result<Vec<AppendOutcome>, QueueError>;

    /// Record by digest.
    fn get(&self, digest: &ProofDigest) -> Option<StoredProof>;

    /// Up to `limit` `Pending` records, oldest capture first.
    fn list_pending(&self, limit: usize) -> Vec<StoredProof>;

    /// Up to `limit` records the orchestrator may send (`Pending` first,
    /// then `Failed`), each group oldest capture first.
    fn list_submittable(&self, limit: usize) -> Vec<StoredProof>;

    /// Every record in `state`, oldest capture first.
    fn list_by_state(&self, state: SubmissionState) -> Vec<StoredProof>;

    /// `Pending | Failed -> Submitted`.
    fn mark_submitted(&self, digest: &ProofDigest, reference: LedgerReference) -> Result<StoredProof, QueueError>;

    /// Mark every digest `Submitted` under one reference and batch root.
    /// Either all records change or none do.
    fn mark_batch_submitted(
        &self,
        digests: &[ProofDigest],
        reference: LedgerReference,
        root: MerkleRoot,
    ) -> Result<(), QueueError>;

    /// `Pending | Submitted | Failed -> Failed` with `reason` as `last_error`.
    fn mark_failed(&self, digest: &ProofDigest, reason: &str) -> Result<StoredProof, QueueError>;

    /// `Submitted -> Confirmed`. Confirming a confirmed record is a no-op.
    fn mark_confirmed(&self, digest: &ProofDigest) -> Result<StoredProof, QueueError>;

    /// Reset every `Failed` record to `Pending`. Returns how many moved.
    fn requeue_failed(&self) -> Result<usize, QueueError>;

    /// Every record of `kind`, oldest capture first.
    fn query_by_kind(&self, kind: SensorKind) -> Vec<StoredProof>;

    /// Records captured in `[start, end]`, oldest capture first.
    fn query_by_time_range(&self, start: Timestamp, end: Timestamp) -> Vec<StoredProof>;

    /// Delete records captured more than `age_ms` ago. Irreversible.
    fn purge_older_than(&self, age_ms: u64) -> Result<usize, QueueError>;

    /// Snapshot of every record.
    fn export_all(&self) -> Vec<u8>;

    /// Merge a snapshot by digest. A `Confirmed` record is never replaced.
    fn import_merging(&self, snapshot: &[u8]) -> Result<ImportReport, QueueError>;

    /// Fold duplicates and rewrite every record under its canonical key.
    fn compact(&self) -> Result<CompactionReport, QueueError>;

    /// Per-state counts.
    fn stats(&self) -> QueueStats;

    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the queue holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
