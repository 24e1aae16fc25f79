//! # Submission Service
//!
//! Implements `SubmissionApi` over a `LedgerTransport` and a proof queue.
//! The queue is written after every transport outcome; this service keeps
//! no submission state of its own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use ps_04_merkle_aggregation::{AggregationError, MerkleBatch};
use ps_05_proof_queue::{ProofQueueApi, QueueError, SubmissionState};
use shared_types::{
    LedgerReference, ProofDigest, SignedProof, SystemTimeSource, TimeSource,
};
use tracing::{debug, error, info, warn};

use crate::config::SubmissionConfig;
use crate::domain::{
    BatchCommitment, BatchReceipt, DrainReport, LedgerStatus, RefreshReport, SubmissionError,
    SubmissionMode, TransportError,
};
use crate::ports::inbound::SubmissionApi;
use crate::ports::outbound::LedgerTransport;

/// Submission orchestrator.
pub struct SubmissionService<L: LedgerTransport, Q: ProofQueueApi, T: TimeSource = SystemTimeSource> {
    transport: Arc<L>,
    queue: Arc<Q>,
    time: T,
    config: SubmissionConfig,
}

impl<L: LedgerTransport, Q: ProofQueueApi> SubmissionService<L, Q, SystemTimeSource> {
    /// Service using the system clock for commitment timestamps.
    pub fn new(transport: Arc<L>, queue: Arc<Q>, config: SubmissionConfig) -> Self {
        Self::with_time_source(transport, queue, SystemTimeSource, config)
    }
}

impl<L: LedgerTransport, Q: ProofQueueApi, T: TimeSource> SubmissionService<L, Q, T> {
    /// Service using an explicit clock.
    pub fn with_time_source(transport: Arc<L>, queue: Arc<Q>, time: T, config: SubmissionConfig) -> Self {
        Self {
            transport,
            queue,
            time,
            config,
        }
    }

    /// Ledger transport.
    pub fn transport(&self) -> &Arc<L> {
        &self.transport
    }

    /// Proof queue.
    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    /// Active configuration.
    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Make sure the queue holds `proof` in a submittable state.
    ///
    /// Returns the existing reference when the proof already went out.
    fn ensure_submittable(&self, proof: &SignedProof) -> Result<Option<LedgerReference>, SubmissionError> {
        match self.queue.get(proof.digest()) {
            None => {
                self.queue.append(proof.clone())?;
                Ok(None)
            }
            Some(record) if record.state().is_submittable() => Ok(None),
            Some(record) => match record.ledger_reference() {
                Some(reference) => Ok(Some(reference.clone())),
                None => Err(SubmissionError::NotSubmittable {
                    digest: *proof.digest(),
                    state: record.state(),
                }),
            },
        }
    }

    /// Run `call` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// No queue writes happen here; used where state must not move on failure.
    async fn call_with_retry<F, Fut>(&self, what: &str, call: F) -> Result<(LedgerReference, u32), SubmissionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<LedgerReference, TransportError>>,
    {
        let retry = &self.config.retry;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match call().await {
                Ok(reference) => return Ok((reference, attempts)),
                Err(e) if !e.is_retryable() || attempts > retry.max_retries => {
                    error!("[ps-06] {} failed after {} attempts: {}", what, attempts, e);
                    return Err(SubmissionError::Transport { error: e, attempts });
                }
                Err(e) => {
                    let delay = retry.delay_for_attempt(attempts - 1);
                    warn!(
                        "[ps-06] {} attempt {}/{} failed, retrying in {:?}: {}",
                        what,
                        attempts,
                        retry.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn mark_each_confirmed(&self, digests: &[ProofDigest], report: &mut RefreshReport) -> Result<(), SubmissionError> {
        for digest in digests {
            match self.queue.mark_confirmed(digest) {
                Ok(_) => report.confirmed += 1,
                Err(QueueError::InvalidTransition { from, .. }) => {
                    warn!("[ps-06] {} moved to {} while polling, skipping", digest, from)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn mark_each_failed(&self, digests: &[ProofDigest], reason: &str, report: &mut RefreshReport) -> Result<(), SubmissionError> {
        for digest in digests {
            match self.queue.mark_failed(digest, reason) {
                Ok(_) => report.failed += 1,
                Err(QueueError::InvalidTransition { from, .. }) => {
                    warn!("[ps-06] {} moved to {} while polling, skipping", digest, from)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<L: LedgerTransport, Q: ProofQueueApi, T: TimeSource> SubmissionApi for SubmissionService<L, Q, T> {
    async fn submit_one(&self, proof: &SignedProof) -> Result<LedgerReference, SubmissionError> {
        let digest = *proof.digest();
        if let Some(reference) = self.ensure_submittable(proof)? {
            debug!("[ps-06] {} already submitted as {}", digest, reference);
            return Ok(reference);
        }

        let retry = &self.config.retry;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.transport.submit_single(proof).await {
                Ok(reference) => {
                    self.queue.mark_submitted(&digest, reference.clone())?;
                    info!("[ps-06] Submitted {} as {} (attempt {})", digest, reference, attempts);
                    return Ok(reference);
                }
                Err(e) => {
                    // Record every failure so a crash mid-retry resumes correctly
                    self.queue.mark_failed(&digest, &e.to_string())?;

                    if !e.is_retryable() || attempts > retry.max_retries {
                        error!("[ps-06] Giving up on {} after {} attempts: {}", digest, attempts, e);
                        return Err(SubmissionError::Transport { error: e, attempts });
                    }
                    let delay = retry.delay_for_attempt(attempts - 1);
                    warn!(
                        "[ps-06] Submit of {} failed (attempt {}/{}), retrying in {:?}: {}",
                        digest,
                        attempts,
                        retry.max_retries + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn submit_batch(&self, proofs: &[SignedProof]) -> Result<BatchReceipt, SubmissionError> {
        let first = proofs.first().ok_or(AggregationError::EmptyBatch)?;
        let count = u32::try_from(proofs.len()).map_err(|_| SubmissionError::BatchTooLarge(proofs.len()))?;
        let device = *first.signer_key();
        if proofs.iter().any(|p| *p.signer_key() != device) {
            return Err(SubmissionError::MixedDevices);
        }

        // Every record must be able to move before anything is sent
        let mut missing = Vec::new();
        for proof in proofs {
            match self.queue.get(proof.digest()) {
                None => missing.push(proof.clone()),
                Some(record) if record.state().is_submittable() => {}
                Some(record) => {
                    return Err(SubmissionError::NotSubmittable {
                        digest: *proof.digest(),
                        state: record.state(),
                    })
                }
            }
        }
        if !missing.is_empty() {
            self.queue.append_many(missing)?;
        }

        let batch = MerkleBatch::compute(proofs)?;
        let (start, end) = proofs.iter().fold((u64::MAX, 0), |(lo, hi), p| {
            (lo.min(p.captured_at_ms()), hi.max(p.captured_at_ms()))
        });
        let commitment = BatchCommitment {
            root: batch.merkle_root(),
            count,
            timestamp: self.time.now(),
            start_captured_at: start,
            end_captured_at: end,
            device_id: device,
        };

        let (reference, attempts) = self
            .call_with_retry("Batch commitment", || self.transport.submit_commitment(&commitment))
            .await?;

        let digests: Vec<ProofDigest> = proofs.iter().map(|p| *p.digest()).collect();
        if let Err(e) = self
            .queue
            .mark_batch_submitted(&digests, reference.clone(), commitment.root)
        {
            error!(
                "[ps-06] Ledger accepted batch {} but the queue update failed: {}",
                reference, e
            );
            return Err(e.into());
        }

        info!(
            "[ps-06] Submitted batch of {} as {} (root {}, attempt {})",
            count, reference, commitment.root, attempts
        );
        Ok(BatchReceipt { reference, batch })
    }

    async fn drain_pending(&self, batch_size: usize) -> Result<DrainReport, SubmissionError> {
        if batch_size == 0 {
            return Ok(DrainReport::default());
        }
        let records = self.queue.list_submittable(batch_size);
        let Some(oldest) = records.first() else {
            return Ok(DrainReport::default());
        };

        // One device per commitment
        let device = *oldest.proof().signer_key();
        let proofs: Vec<SignedProof> = records
            .into_iter()
            .filter(|r| *r.proof().signer_key() == device)
            .map(|r| r.into_proof())
            .collect();

        let mut report = DrainReport {
            processed: proofs.len(),
            ..DrainReport::default()
        };

        let outcome = if let [single] = proofs.as_slice() {
            report.mode = Some(SubmissionMode::Single);
            self.submit_one(single).await
        } else {
            report.mode = Some(SubmissionMode::Batch);
            self.submit_batch(&proofs).await.map(|receipt| receipt.reference)
        };

        match outcome {
            Ok(reference) => {
                report.submitted = report.processed;
                report.reference = Some(reference);
            }
            Err(SubmissionError::Transport { error, .. }) => {
                report.failed = report.processed;
                report.last_error = Some(error.to_string());
            }
            Err(e) => return Err(e),
        }

        debug!(
            "[ps-06] Drained {} ({} submitted, {} failed)",
            report.processed, report.submitted, report.failed
        );
        Ok(report)
    }

    async fn refresh_statuses(&self) -> Result<RefreshReport, SubmissionError> {
        let mut by_reference: HashMap<LedgerReference, Vec<ProofDigest>> = HashMap::new();
        for record in self.queue.list_by_state(SubmissionState::Submitted) {
            if let Some(reference) = record.ledger_reference() {
                by_reference
                    .entry(reference.clone())
                    .or_default()
                    .push(*record.digest());
            }
        }

        let mut report = RefreshReport::default();
        for (reference, digests) in by_reference {
            report.polled += 1;
            match self.transport.get_status(&reference).await {
                Ok(LedgerStatus::Confirmed) => {
                    self.mark_each_confirmed(&digests, &mut report)?
                }
                Ok(LedgerStatus::Failed(reason)) => {
                    self.mark_each_failed(&digests, &reason, &mut report)?
                }
                Ok(LedgerStatus::Pending) => report.still_pending += digests.len(),
                Err(e) => {
                    warn!("[ps-06] Status of {} unavailable: {}", reference, e);
                    report.errors += 1;
                }
            }
        }

        if report.confirmed + report.failed > 0 {
            info!(
                "[ps-06] Refresh: {} confirmed, {} failed, {} pending",
                report.confirmed, report.failed, report.still_pending
            );
        }
        Ok(report)
    }
}
