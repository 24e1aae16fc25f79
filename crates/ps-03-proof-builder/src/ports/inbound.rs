//! # Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use ps_02_key_custodian::KeyHandle;
use shared_types::{Reading, SignedProof};

use crate::domain::{BatchBuildReport, ProofError};

/// Proof construction API.
#[async_trait]
pub trait ProofBuilderApi: Send + Sync {
    /// Build one signed proof.
    async fn build_proof(&self, reading: Reading, handle: &KeyHandle) -> Result<SignedProof, ProofError>;

    /// Re-encode and check signature and digest. Never errors.
    fn verify_locally(&self, proof: &SignedProof) -> bool;

    /// Build proofs sequentially, skipping failures.
    async fn build_batch(&self, readings: Vec<Reading>, handle: &KeyHandle) -> Vec<SignedProof> {
        self.build_batch_report(readings, handle).await.proofs
    }

    /// Like `build_batch`, with the reason for every skipped reading.
    async fn build_batch_report(&self, readings: Vec<Reading>, handle: &KeyHandle) -> BatchBuildReport;
}
