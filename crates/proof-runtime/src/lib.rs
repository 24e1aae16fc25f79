//! # Proof Runtime
//!
//! Wires the sensor proof pipeline into one long-running process.
//!
//! ## Data Flow
//!
//! ```text
//! Tracking (07) ──Reading──▶ Capture ──SignedProof──▶ Proof Queue (05)
//!   one task per kind        build_proof (03)              │
//!                            sign via custodian (02)       │ list_submittable
//!                                                          ▼
//!                                             Submission (06) every tick
//!                                             Merkle batch (04) ──▶ ledger
//! ```
//!
//! ## Shutdown Sequence
//!
//! 1. Stop tracking; in-flight samples complete and are delivered
//! 2. Capture drains the reading channel into the queue
//! 3. Submission runs a final flush cycle
//! 4. Custodian session is closed
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and stage instances
//! - `handlers/` - Capture and submission tasks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod handlers;

use std::sync::Arc;

use parking_lot::Mutex;
use proof_telemetry::SAMPLING_FAILURES;
use ps_02_key_custodian::{CustodianError, KeyCustodianApi};
use ps_07_sensor_sampling::{spawn_tracking, SamplingError, TrackingHandle, TrackingSummary};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use container::{ConfigError, ContainerError, PipelineContainer, RuntimeConfig};
pub use handlers::{CaptureHandler, CaptureSummary, CycleReport, SubmissionHandler};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Pipeline could not be assembled.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Custodian refused to open a session.
    #[error("Custodian: {0}")]
    Custodian(#[from] CustodianError),

    /// Tracking could not be started.
    #[error("Tracking: {0}")]
    Sampling(#[from] SamplingError),

    /// `start` called twice.
    #[error("Runtime already started")]
    AlreadyStarted,
}

/// What each task reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tracking counters summed over all kinds.
    pub tracking: TrackingSummary,
    /// Proof building and queueing.
    pub capture: CaptureSummary,
    /// Submission cycles.
    pub submission: CycleReport,
}

struct RunningTasks {
    tracking: Vec<TrackingHandle>,
    forwarders: Vec<JoinHandle<()>>,
    capture: JoinHandle<Result<CaptureSummary, CustodianError>>,
    submission: JoinHandle<CycleReport>,
}

/// The runtime orchestrating all stages.
pub struct ProofRuntime {
    /// Stage instances.
    container: Arc<PipelineContainer>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Option<RunningTasks>>,
}

impl ProofRuntime {
    /// Assemble the pipeline without starting any task.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        info!("Creating sensor proof runtime");
        let container = Arc::new(PipelineContainer::new(config)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(None),
        })
    }

    /// Authorize the custodian and spawn tracking, capture and submission.
    ///
    /// # Errors
    /// * `RuntimeError::Custodian` - the signer refused authorization
    /// * `RuntimeError::Sampling` - a tracking trigger is invalid for its kind
    pub async fn start(&self) -> Result<(), RuntimeError> {
        let started = self.tasks.lock().is_some();
        if started {
            return Err(RuntimeError::AlreadyStarted);
        }
        let c = &self.container;
        let handle = c.custodian.authorize().await?;
        info!("Custodian authorized for device {}", handle.public_key());

        let (readings_tx, readings_rx) = mpsc::channel(c.config.channel_capacity.max(1));
        let mut tracking = Vec::with_capacity(c.config.sensors.len());
        let mut forwarders = Vec::with_capacity(c.config.sensors.len());
        for &kind in &c.config.sensors {
            let (tracker, mut kind_rx) =
                match spawn_tracking(Arc::clone(&c.sampler), kind, c.config.tracking_for(kind)) {
                    Ok(started) => started,
                    Err(e) => {
                        for running in tracking {
                            TrackingHandle::shutdown(running).await;
                        }
                        return Err(e.into());
                    }
                };
            let tx = readings_tx.clone();
            forwarders.push(tokio::spawn(async move {
                while let Some(reading) = kind_rx.recv().await {
                    if tx.send(reading).await.is_err() {
                        break;
                    }
                }
            }));
            tracking.push(tracker);
        }
        // Capture ends once every forwarder has dropped its sender
        drop(readings_tx);

        let capture = CaptureHandler::new(
            Arc::clone(&c.builder),
            Arc::clone(&c.custodian),
            Arc::clone(&c.queue),
        );
        let capture = tokio::spawn(capture.run(readings_rx));

        let submission = SubmissionHandler::new(
            Arc::clone(&c.submitter),
            Arc::clone(&c.queue),
            c.config.batch_size,
            c.config.drain_interval,
        );
        let submission = tokio::spawn(submission.run(self.shutdown_rx.clone()));

        *self.tasks.lock() = Some(RunningTasks {
            tracking,
            forwarders,
            capture,
            submission,
        });
        info!("Pipeline started: tracking {:?}", c.config.sensors);
        Ok(())
    }

    /// Shut down gracefully. Returns what each task reported.
    pub async fn shutdown(&self) -> RunSummary {
        let tasks = self.tasks.lock().take();
        let Some(tasks) = tasks else {
            return RunSummary::default();
        };
        info!("Initiating graceful shutdown...");
        let mut summary = RunSummary::default();

        for handle in tasks.tracking {
            let kind = handle.kind();
            let tracked = handle.shutdown().await;
            SAMPLING_FAILURES
                .with_label_values(&[kind.as_str()])
                .inc_by(tracked.failures as f64);
            summary.tracking.emitted += tracked.emitted;
            summary.tracking.stationary += tracked.stationary;
            summary.tracking.failures += tracked.failures;
        }
        for forwarder in tasks.forwarders {
            if let Err(e) = forwarder.await {
                warn!("Reading forwarder ended abnormally: {}", e);
            }
        }

        match tasks.capture.await {
            Ok(Ok(capture)) => summary.capture = capture,
            Ok(Err(e)) => error!("Capture could not authorize: {}", e),
            Err(e) => error!("Capture task ended abnormally: {}", e),
        }

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        match tasks.submission.await {
            Ok(report) => summary.submission = report,
            Err(e) => error!("Submission task ended abnormally: {}", e),
        }

        let custodian = &self.container.custodian;
        if custodian.is_authorized() {
            match custodian.authorize().await {
                Ok(handle) => {
                    if let Err(e) = custodian.deauthorize(&handle).await {
                        warn!("Failed to close custodian session: {}", e);
                    }
                }
                Err(e) => warn!("Failed to close custodian session: {}", e),
            }
        }

        info!("Shutdown complete");
        summary
    }

    /// Get a reference to the pipeline container.
    pub fn container(&self) -> Arc<PipelineContainer> {
        Arc::clone(&self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_05_proof_queue::{ProofQueueApi, SubmissionState};
    use std::time::Duration;

    #[tokio::test]
    async fn test_short_run_confirms_everything_it_captured() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = ProofRuntime::new(RuntimeConfig::for_testing(dir.path().into())).unwrap();
        runtime.start().await.unwrap();
        assert!(matches!(runtime.start().await, Err(RuntimeError::AlreadyStarted)));

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        let summary = runtime.shutdown().await;

        let container = runtime.container();
        let stats = container.queue.stats();
        assert!(summary.capture.queued > 0);
        assert_eq!(stats.total() as u64, summary.capture.queued);
        assert_eq!(stats.confirmed, stats.total());
        assert_eq!(
            container.ledger.device_stats(&container.device()).unwrap().proof_count,
            summary.capture.queued
        );
        assert!(!container.custodian.is_authorized());
    }

    #[tokio::test]
    async fn test_restart_reopens_queue_with_same_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RuntimeConfig::for_testing(dir.path().into());
        config.signer_seed = Some("07".repeat(32));

        let first = ProofRuntime::new(config.clone()).unwrap();
        let device = first.container().device();
        first.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let queued = first.shutdown().await.capture.queued;
        drop(first);

        let second = ProofRuntime::new(config).unwrap();
        let container = second.container();
        assert_eq!(container.device(), device);
        assert_eq!(container.queue.len() as u64, queued);
        assert_eq!(
            container.queue.list_by_state(SubmissionState::Confirmed).len() as u64,
            queued
        );
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = ProofRuntime::new(RuntimeConfig::for_testing(dir.path().into())).unwrap();
        assert_eq!(runtime.shutdown().await, RunSummary::default());
    }
}
