//! # Submission Handler
//!
//! Periodic submission cycle:
//!
//! ```text
//! tick ──▶ drain_pending (repeat while batches go through)
//!      ──▶ refresh_statuses
//!      ──▶ queue gauge
//! ```
//!
//! A shutdown signal triggers one last cycle so records queued since the
//! previous tick are flushed before exit.

use std::sync::Arc;
use std::time::Duration;

use proof_telemetry::{metric_inc, BATCH_SIZE, PROOFS_CONFIRMED, QUEUE_PENDING, SUBMISSIONS};
use ps_05_proof_queue::ProofQueueApi;
use ps_06_submission::SubmissionApi;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Drain calls per cycle; bounds a cycle when the queue keeps refilling.
pub const MAX_DRAIN_ROUNDS: usize = 16;

/// Totals for one or more cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Drain calls that sent something.
    pub rounds: usize,
    /// Records moved to `Submitted`.
    pub submitted: usize,
    /// Records whose submission failed.
    pub failed: usize,
    /// Records moved to `Confirmed`.
    pub confirmed: usize,
}

impl CycleReport {
    fn absorb(&mut self, other: CycleReport) {
        self.rounds += other.rounds;
        self.submitted += other.submitted;
        self.failed += other.failed;
        self.confirmed += other.confirmed;
    }
}

/// Drives the orchestrator on a fixed period.
pub struct SubmissionHandler<S, Q> {
    submitter: Arc<S>,
    queue: Arc<Q>,
    batch_size: usize,
    interval: Duration,
}

impl<S: SubmissionApi, Q: ProofQueueApi> SubmissionHandler<S, Q> {
    /// Handler draining `batch_size` records per call every `interval`.
    pub fn new(submitter: Arc<S>, queue: Arc<Q>, batch_size: usize, interval: Duration) -> Self {
        Self {
            submitter,
            queue,
            batch_size,
            interval,
        }
    }

    /// One drain + refresh pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for _ in 0..MAX_DRAIN_ROUNDS {
            let drain = match self.submitter.drain_pending(self.batch_size).await {
                Ok(drain) => drain,
                Err(e) => {
                    error!("[ps-06] Drain failed: {}", e);
                    break;
                }
            };
            if drain.processed == 0 {
                break;
            }

            report.rounds += 1;
            report.submitted += drain.submitted;
            report.failed += drain.failed;
            BATCH_SIZE.observe(drain.processed as f64);
            if let Some(mode) = drain.mode {
                let outcome = if drain.last_error.is_none() { "submitted" } else { "failed" };
                metric_inc!(SUBMISSIONS, &[mode.as_str(), outcome]);
            }

            if let Some(e) = drain.last_error {
                warn!("[ps-06] Submission of {} records failed: {}", drain.processed, e);
                break;
            }
        }

        match self.submitter.refresh_statuses().await {
            Ok(refresh) => {
                report.confirmed += refresh.confirmed;
                report.failed += refresh.failed;
                PROOFS_CONFIRMED.inc_by(refresh.confirmed as f64);
                if refresh.errors > 0 {
                    warn!("[ps-06] {} ledger references could not be polled", refresh.errors);
                }
            }
            Err(e) => error!("[ps-06] Status refresh failed: {}", e),
        }

        let stats = self.queue.stats();
        QUEUE_PENDING.set((stats.pending + stats.failed) as f64);
        debug!(
            "[ps-06] Cycle done: {} submitted, {} confirmed, {} awaiting submission",
            report.submitted,
            report.confirmed,
            stats.pending + stats.failed
        );
        report
    }

    /// Run cycles until `shutdown` flips, then flush once more.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> CycleReport {
        let mut totals = CycleReport::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("[ps-06] Submitting every {:?} in batches of {}", self.interval, self.batch_size);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("[ps-06] Shutdown signal received, flushing queue");
                    totals.absorb(self.run_cycle().await);
                    break;
                }
                _ = ticker.tick() => totals.absorb(self.run_cycle().await),
            }
        }

        info!(
            "[ps-06] Submission stopped ({} submitted, {} confirmed, {} failed)",
            totals.submitted, totals.confirmed, totals.failed
        );
        totals
    }
}
