//! # Sensor Proof Runtime
//!
//! Entry point for the sensor proof pipeline.
//!
//! ## Startup Sequence
//!
//! 1. Install logging and register metrics (`PS_LOG_LEVEL`, `PS_JSON_LOGS`)
//! 2. Load `PS_*` configuration
//! 3. Assemble stages and lock the queue directory
//! 4. Authorize the custodian and start tracking, capture and submission
//! 5. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use proof_runtime::{ProofRuntime, RuntimeConfig};
use proof_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;
    info!("Starting {} v{}", telemetry.service_name, env!("CARGO_PKG_VERSION"));

    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;
    let runtime = ProofRuntime::new(config).context("Failed to assemble pipeline")?;
    runtime.start().await.context("Failed to start pipeline")?;

    info!("Pipeline is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    let summary = runtime.shutdown().await;
    info!(
        "Captured {} readings, queued {} proofs, submitted {}, confirmed {}",
        summary.tracking.emitted,
        summary.capture.queued,
        summary.submission.submitted,
        summary.submission.confirmed
    );

    Ok(())
}
