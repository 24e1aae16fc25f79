//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Filter directive (`info`, `ps_05_proof_queue=debug,info`, ...)
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,

    /// Include source file and line in each event
    pub with_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "sensor-proof".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_location: false,
        }
    }
}

fn flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PS_SERVICE_NAME`: Service name (default: sensor-proof)
    /// - `PS_LOG_LEVEL` or `RUST_LOG`: Filter (default: info)
    /// - `PS_JSON_LOGS`: JSON output (default: false, true in containers)
    /// - `PS_LOG_LOCATION`: Source locations (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        let defaults = Self::default();

        Self {
            service_name: lookup("PS_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("PS_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("PS_JSON_LOGS")
                .map(|v| flag(&v))
                .unwrap_or(is_container),
            with_location: lookup("PS_LOG_LOCATION")
                .map(|v| flag(&v))
                .unwrap_or(defaults.with_location),
        }
    }
}
