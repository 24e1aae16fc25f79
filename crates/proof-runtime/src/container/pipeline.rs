//! # Pipeline Container
//!
//! Holds every stage instance and wires their ports together.
//!
//! ## Initialization Order
//!
//! ```text
//! Signer ──▶ Key Custodian (02) ──▶ Proof Builder (03)
//! Queue directory ──▶ Proof Queue (05)
//! Ledger ──▶ Submission Orchestrator (06) ◀── Proof Queue
//! Synthetic source ──▶ Sensor Sampler (07)
//! ```
//!
//! The device key is registered with the ledger before anything is
//! submitted, so the first batch is accepted.

use std::sync::Arc;

use ps_02_key_custodian::{KeyCustodian, SoftwareSigner, SoftwareSignerConfig};
use ps_03_proof_builder::{ProofBuilder, ProofBuilderConfig};
use ps_05_proof_queue::{FileBackedKVStore, ProofQueue, QueueError};
use ps_06_submission::{InMemoryLedger, LedgerConfig, SubmissionService};
use ps_07_sensor_sampling::{SensorSampler, SyntheticSensorSource};
use shared_crypto::{CryptoError, Ed25519KeyPair};
use shared_types::DevicePublicKey;
use thiserror::Error;
use tracing::{info, instrument};

use crate::container::config::{ConfigError, RuntimeConfig};

/// Custodian over the in-process signer.
pub type Custodian = KeyCustodian<SoftwareSigner>;
/// Builder signing through [`Custodian`].
pub type Builder = ProofBuilder<Custodian>;
/// File-backed queue.
pub type Queue = ProofQueue<FileBackedKVStore>;
/// Orchestrator over the simulated ledger.
pub type Submitter = SubmissionService<InMemoryLedger, Queue>;
/// Sampler over the synthetic sensors.
pub type Sampler = SensorSampler<SyntheticSensorSource>;

/// Errors while assembling the pipeline.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Configuration rejected.
    #[error("Configuration: {0}")]
    Config(#[from] ConfigError),

    /// Queue directory could not be opened.
    #[error("Queue: {0}")]
    Queue(#[from] QueueError),

    /// Signer seed unusable.
    #[error("Signer key: {0}")]
    Signer(#[from] CryptoError),
}

/// Central container holding all stage instances.
pub struct PipelineContainer {
    /// Key Custodian (Stage 02).
    pub custodian: Arc<Custodian>,
    /// Proof Builder (Stage 03).
    pub builder: Arc<Builder>,
    /// Proof Queue (Stage 05).
    pub queue: Arc<Queue>,
    /// Simulated ledger behind the orchestrator.
    pub ledger: Arc<InMemoryLedger>,
    /// Submission Orchestrator (Stage 06).
    pub submitter: Arc<Submitter>,
    /// Sensor Sampler (Stage 07).
    pub sampler: Arc<Sampler>,
    /// Configuration (immutable after initialization).
    pub config: RuntimeConfig,
}

impl PipelineContainer {
    /// Build every stage from `config`.
    ///
    /// # Errors
    /// * `ContainerError::Queue` - the queue directory is locked or unreadable
    /// * `ContainerError::Signer` - the configured seed is not a key
    #[instrument(name = "pipeline_init", skip(config))]
    pub fn new(config: RuntimeConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        info!("Initializing sensor proof pipeline");

        let keypair = match &config.signer_seed {
            Some(seed) => Ed25519KeyPair::from_hex_seed(seed)?,
            None => Ed25519KeyPair::generate(),
        };
        let signer = SoftwareSigner::new(keypair, SoftwareSignerConfig::default());
        let device = signer.public_key();
        let custodian = Arc::new(KeyCustodian::new(signer));
        info!("  [02] Key custodian ready for device {}", device);

        let builder = Arc::new(ProofBuilder::new(
            Arc::clone(&custodian),
            ProofBuilderConfig {
                format: config.queue.format,
                ..ProofBuilderConfig::default()
            },
        ));
        info!("  [03] Proof builder initialized");

        let queue = Arc::new(ProofQueue::open_dir(&config.data_dir, config.queue.clone())?);
        info!("  [05] Proof queue opened at {}", config.data_dir.display());

        let ledger = Arc::new(InMemoryLedger::new(LedgerConfig {
            format: config.queue.format,
            ..config.ledger
        }));
        ledger.register_device(device);
        let submitter = Arc::new(SubmissionService::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            config.submission.clone(),
        ));
        info!("  [06] Submission orchestrator initialized");

        let (lat, lon) = config.origin;
        let source = Arc::new(SyntheticSensorSource::new(lat, lon, config.source_rate));
        let sampler = Arc::new(SensorSampler::new(source, device, config.sampling));
        info!("  [07] Sensor sampler initialized for {:?}", config.sensors);

        Ok(Self {
            custodian,
            builder,
            queue,
            ledger,
            submitter,
            sampler,
            config,
        })
    }

    /// Key the pipeline signs with.
    pub fn device(&self) -> DevicePublicKey {
        self.custodian.signer().public_key()
    }
}
