//! Sampling errors.

use shared_types::SensorKind;
use thiserror::Error;

/// Errors from sampling and tracking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplingError {
    /// Window and grace period passed without a single sample.
    #[error("No {kind} data within {waited_ms} ms")]
    NoData {
        /// Sensor sampled
        kind: SensorKind,
        /// Window plus grace, in ms
        waited_ms: u64,
    },

    /// Source stopped delivering before any sample arrived.
    #[error("{0} source closed")]
    SourceClosed(SensorKind),

    /// Source has no sensor of this kind.
    #[error("{0} sensor unavailable")]
    Unavailable(SensorKind),

    /// Movement triggers only apply to GPS tracking.
    #[error("Movement trigger requires gps, got {0}")]
    InvalidTrigger(SensorKind),
}
