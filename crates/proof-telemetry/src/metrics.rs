//! Prometheus metrics for the proof pipeline.
//!
//! All metrics follow the naming convention: `ps_<stage>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PROOF BUILDER (Stage 3)
    // =========================================================================

    /// Proofs signed and built
    pub static ref PROOFS_BUILT: CounterVec = CounterVec::new(
        Opts::new("ps_builder_proofs_built_total", "Signed proofs built, by sensor kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Readings skipped during batch builds
    pub static ref PROOFS_SKIPPED: Counter = Counter::new(
        "ps_builder_readings_skipped_total",
        "Readings skipped because encoding or signing failed"
    ).expect("metric creation failed");

    /// Signing failures surfaced to callers
    pub static ref SIGNING_FAILURES: Counter = Counter::new(
        "ps_builder_signing_failures_total",
        "Signing attempts that failed after re-authorization"
    ).expect("metric creation failed");

    // =========================================================================
    // QUEUE (Stage 5)
    // =========================================================================

    /// Proofs appended to the durable queue
    pub static ref PROOFS_QUEUED: Counter = Counter::new(
        "ps_queue_proofs_queued_total",
        "Proofs appended to the durable queue"
    ).expect("metric creation failed");

    /// Records waiting for submission
    pub static ref QUEUE_PENDING: Gauge = Gauge::new(
        "ps_queue_records_pending",
        "Records in Pending or Failed state"
    ).expect("metric creation failed");

    // =========================================================================
    // SUBMISSION (Stage 6)
    // =========================================================================

    /// Submission calls by mode and outcome
    pub static ref SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("ps_submission_calls_total", "Submissions by mode and outcome"),
        &["mode", "outcome"]  // mode: single/batch, outcome: submitted/failed
    ).expect("metric creation failed");

    /// Proofs confirmed by the ledger
    pub static ref PROOFS_CONFIRMED: Counter = Counter::new(
        "ps_submission_proofs_confirmed_total",
        "Proofs whose submission the ledger confirmed"
    ).expect("metric creation failed");

    /// Proofs per submission
    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("ps_submission_batch_size", "Proofs carried per submission")
            .buckets(exponential_buckets(1.0, 2.0, 10).expect("bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // SAMPLING (Stage 7)
    // =========================================================================

    /// Sampling calls that produced no reading
    pub static ref SAMPLING_FAILURES: CounterVec = CounterVec::new(
        Opts::new("ps_sampling_failures_total", "Sampling failures by sensor kind"),
        &["kind"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// # Errors
/// * `TelemetryError::MetricsInit` - a metric is already registered
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Builder
        Box::new(PROOFS_BUILT.clone()),
        Box::new(PROOFS_SKIPPED.clone()),
        Box::new(SIGNING_FAILURES.clone()),
        // Queue
        Box::new(PROOFS_QUEUED.clone()),
        Box::new(QUEUE_PENDING.clone()),
        // Submission
        Box::new(SUBMISSIONS.clone()),
        Box::new(PROOFS_CONFIRMED.clone()),
        Box::new(BATCH_SIZE.clone()),
        // Sampling
        Box::new(SAMPLING_FAILURES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
