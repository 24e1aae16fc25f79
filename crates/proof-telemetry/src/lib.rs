//! # Proof Telemetry
//!
//! Logging and metrics for the sensor proof pipeline.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use proof_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PS_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `PS_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `PS_LOG_LOCATION` | `false` | Source file and line |
//! | `PS_SERVICE_NAME` | `sensor-proof` | Service name |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, BATCH_SIZE, PROOFS_BUILT, PROOFS_CONFIRMED, PROOFS_QUEUED,
    PROOFS_SKIPPED, QUEUE_PENDING, SAMPLING_FAILURES, SIGNING_FAILURES, SUBMISSIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
