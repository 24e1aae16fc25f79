//! # Capture Handler
//!
//! Turns tracked readings into signed proofs and appends them to the queue.
//! Runs until every tracking task has closed its side of the channel.

use std::sync::Arc;

use proof_telemetry::{metric_inc, PROOFS_BUILT, PROOFS_QUEUED, PROOFS_SKIPPED, SIGNING_FAILURES};
use ps_02_key_custodian::{CustodianError, KeyCustodianApi, KeyHandle};
use ps_03_proof_builder::{ProofBuilderApi, ProofError};
use ps_05_proof_queue::{AppendOutcome, ProofQueueApi};
use shared_types::{Reading, SignedProof};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters reported when the handler exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Proofs signed.
    pub built: u64,
    /// Proofs newly stored.
    pub queued: u64,
    /// Proofs whose digest was already stored.
    pub duplicates: u64,
    /// Readings that produced no stored proof.
    pub failed: u64,
}

/// Consumes readings and feeds the proof queue.
pub struct CaptureHandler<B, C, Q> {
    builder: Arc<B>,
    custodian: Arc<C>,
    queue: Arc<Q>,
}

impl<B, C, Q> CaptureHandler<B, C, Q>
where
    B: ProofBuilderApi,
    C: KeyCustodianApi,
    Q: ProofQueueApi,
{
    /// Handler signing through `custodian` and storing into `queue`.
    pub fn new(builder: Arc<B>, custodian: Arc<C>, queue: Arc<Q>) -> Self {
        Self {
            builder,
            custodian,
            queue,
        }
    }

    /// Sign `reading`, re-authorizing once if the session was closed under us.
    async fn build(&self, handle: &mut KeyHandle, reading: Reading) -> Result<SignedProof, ProofError> {
        match self.builder.build_proof(reading.clone(), handle).await {
            Err(ProofError::NotAuthorized) => {
                warn!("[ps-03] Custodian session lost, re-authorizing");
                *handle = self
                    .custodian
                    .authorize()
                    .await
                    .map_err(|e| ProofError::SigningError(e.to_string()))?;
                self.builder.build_proof(reading, handle).await
            }
            other => other,
        }
    }

    async fn handle(&self, handle: &mut KeyHandle, reading: Reading, summary: &mut CaptureSummary) {
        let kind = reading.kind();
        let proof = match self.build(handle, reading).await {
            Ok(proof) => proof,
            Err(e) => {
                summary.failed += 1;
                match e {
                    ProofError::SigningError(_) | ProofError::NotAuthorized => {
                        metric_inc!(SIGNING_FAILURES)
                    }
                    _ => metric_inc!(PROOFS_SKIPPED),
                }
                warn!("[ps-03] Dropping {} reading: {}", kind, e);
                return;
            }
        };
        summary.built += 1;
        metric_inc!(PROOFS_BUILT, &[kind.as_str()]);

        let digest = *proof.digest();
        match self.queue.append(proof) {
            Ok(AppendOutcome::Inserted) => {
                summary.queued += 1;
                metric_inc!(PROOFS_QUEUED);
                debug!("[ps-05] Queued {} proof {}", kind, digest);
            }
            Ok(AppendOutcome::Duplicate(state)) => {
                summary.duplicates += 1;
                debug!("[ps-05] Proof {} already stored ({})", digest, state);
            }
            Err(e) => {
                summary.failed += 1;
                error!("[ps-05] Failed to queue proof {}: {}", digest, e);
            }
        }
    }

    /// Process readings until the channel closes.
    ///
    /// # Errors
    /// * `CustodianError` - the initial authorization was refused
    pub async fn run(self, mut readings: mpsc::Receiver<Reading>) -> Result<CaptureSummary, CustodianError> {
        let mut handle = self.custodian.authorize().await?;
        let mut summary = CaptureSummary::default();

        while let Some(reading) = readings.recv().await {
            self.handle(&mut handle, reading, &mut summary).await;
        }

        info!(
            "[ps-03] Capture finished: {} built, {} queued, {} duplicates, {} failed",
            summary.built, summary.queued, summary.duplicates, summary.failed
        );
        Ok(summary)
    }
}
