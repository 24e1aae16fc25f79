//! Subscriber installation.
//!
//! One `fmt` layer under an `EnvFilter`; JSON lines when configured, plain
//! text otherwise.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Build the filter from the configured directive.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level '{}': {}", config.log_level, e)))
}

/// Install the global subscriber.
///
/// # Errors
/// * `TelemetryError::Config` - the filter directive does not parse
/// * `TelemetryError::LoggingInit` - a global subscriber is already set
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.with_location)
            .with_line_number(config.with_location);

        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.with_location)
            .with_line_number(config.with_location)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_rejected() {
        let config = TelemetryConfig {
            log_level: "ps_01_canonical_encoding=loud".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(matches!(env_filter(&config), Err(TelemetryError::Config(_))));
    }

    #[test]
    fn test_module_directives_accepted() {
        let config = TelemetryConfig {
            log_level: "ps_05_proof_queue=debug,warn".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(env_filter(&config).is_ok());
    }
}
