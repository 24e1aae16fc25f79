//! # Runtime Configuration
//!
//! Unified configuration for every pipeline stage, read from `PS_*`
//! environment variables on top of each stage's defaults.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PS_DATA_DIR` | `./data/proofs` | Queue directory |
//! | `PS_SENSORS` | `gps,barometer` | Comma-separated kinds to track |
//! | `PS_TRACKING_INTERVAL_MS` | `30000` | Sampling period per kind |
//! | `PS_MOVEMENT_MIN_M` | unset | GPS emits only after moving this far |
//! | `PS_SAMPLE_WINDOW_MS` | `1000` | Collection window per sample |
//! | `PS_SAMPLE_GRACE_MS` | `2000` | Extra wait for a late first sample |
//! | `PS_SOURCE_RATE_MS` | `200` | Synthetic sensor callback rate |
//! | `PS_ORIGIN_LAT` / `PS_ORIGIN_LON` | `51.5074` / `-0.1278` | Synthetic walk start |
//! | `PS_BATCH_SIZE` | `32` | Records per ledger submission |
//! | `PS_DRAIN_INTERVAL_SECS` | `60` | Submission cycle period |
//! | `PS_MAX_RETRIES` | `5` | Transport retries per submission |
//! | `PS_LEDGER_AUTO_CONFIRM` | `true` | Simulated ledger confirms at once |
//! | `PS_SIGNER_SEED` | random | 64 hex chars, fixes the device key |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ps_05_proof_queue::QueueConfig;
use ps_06_submission::{LedgerConfig, SubmissionConfig};
use ps_07_sensor_sampling::{SamplingConfig, TrackingConfig, TrackingTrigger};
use shared_types::SensorKind;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        /// Variable name
        var: String,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },

    /// `PS_SENSORS` names no sensor.
    #[error("No sensors configured")]
    NoSensors,

    /// A duration or size that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// Signer seed is not 32 bytes of hex.
    #[error("PS_SIGNER_SEED must be 64 hex characters")]
    BadSeed,
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Queue directory.
    pub data_dir: PathBuf,
    /// Kinds tracked, deduplicated, in the order given.
    pub sensors: Vec<SensorKind>,
    /// Sampling period per kind.
    pub tracking_interval: Duration,
    /// Minimum GPS displacement between emitted fixes.
    pub movement_min_m: Option<f64>,
    /// Per-sample window and grace.
    pub sampling: SamplingConfig,
    /// Synthetic source callback rate.
    pub source_rate: Duration,
    /// Synthetic GPS walk origin `(lat, lon)`.
    pub origin: (f64, f64),
    /// Records per submission.
    pub batch_size: usize,
    /// Submission cycle period.
    pub drain_interval: Duration,
    /// Queue settings.
    pub queue: QueueConfig,
    /// Orchestrator settings.
    pub submission: SubmissionConfig,
    /// Simulated ledger settings.
    pub ledger: LedgerConfig,
    /// Hex seed for the device key; `None` generates one.
    pub signer_seed: Option<String>,
    /// Readings buffered between tracking and proof building.
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/proofs"),
            sensors: vec![SensorKind::Gps, SensorKind::Barometer],
            tracking_interval: Duration::from_secs(30),
            movement_min_m: None,
            sampling: SamplingConfig::default(),
            source_rate: Duration::from_millis(200),
            origin: (51.5074, -0.1278),
            batch_size: 32,
            drain_interval: Duration::from_secs(60),
            queue: QueueConfig::default(),
            submission: SubmissionConfig::default(),
            ledger: LedgerConfig {
                auto_confirm: true,
                ..LedgerConfig::default()
            },
            signer_seed: None,
            channel_capacity: 64,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
            var: var.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn parse_sensors(raw: &str) -> Result<Vec<SensorKind>, ConfigError> {
    let mut sensors = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = SensorKind::from_str(&name.to_ascii_lowercase()).map_err(|e| ConfigError::Invalid {
            var: "PS_SENSORS".to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !sensors.contains(&kind) {
            sensors.push(kind);
        }
    }
    if sensors.is_empty() {
        return Err(ConfigError::NoSensors);
    }
    Ok(sensors)
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup and validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("PS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("PS_SENSORS") {
            config.sensors = parse_sensors(&raw)?;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "PS_TRACKING_INTERVAL_MS")? {
            config.tracking_interval = Duration::from_millis(ms);
        }
        config.movement_min_m = parse_var(&lookup, "PS_MOVEMENT_MIN_M")?;
        if let Some(ms) = parse_var(&lookup, "PS_SAMPLE_WINDOW_MS")? {
            config.sampling.window_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "PS_SAMPLE_GRACE_MS")? {
            config.sampling.grace_ms = ms;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "PS_SOURCE_RATE_MS")? {
            config.source_rate = Duration::from_millis(ms);
        }
        if let Some(lat) = parse_var(&lookup, "PS_ORIGIN_LAT")? {
            config.origin.0 = lat;
        }
        if let Some(lon) = parse_var(&lookup, "PS_ORIGIN_LON")? {
            config.origin.1 = lon;
        }
        if let Some(size) = parse_var(&lookup, "PS_BATCH_SIZE")? {
            config.batch_size = size;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PS_DRAIN_INTERVAL_SECS")? {
            config.drain_interval = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var(&lookup, "PS_MAX_RETRIES")? {
            config.submission.retry = config.submission.retry.with_max_retries(retries);
        }
        if let Some(auto) = parse_var(&lookup, "PS_LEDGER_AUTO_CONFIRM")? {
            config.ledger.auto_confirm = auto;
        }
        config.signer_seed = lookup("PS_SIGNER_SEED");

        config.validate()?;
        Ok(config)
    }

    /// Check ranges the stages cannot recover from at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }
        if self.tracking_interval.is_zero() {
            return Err(ConfigError::Zero("PS_TRACKING_INTERVAL_MS"));
        }
        if self.sampling.window_ms == 0 {
            return Err(ConfigError::Zero("PS_SAMPLE_WINDOW_MS"));
        }
        if self.source_rate.is_zero() {
            return Err(ConfigError::Zero("PS_SOURCE_RATE_MS"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("PS_BATCH_SIZE"));
        }
        if self.drain_interval.is_zero() {
            return Err(ConfigError::Zero("PS_DRAIN_INTERVAL_SECS"));
        }
        if let Some(seed) = &self.signer_seed {
            let seed = seed.trim();
            if seed.len() != 64 || !seed.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::BadSeed);
            }
        }
        Ok(())
    }

    /// Tracking settings for one kind. Movement gating applies to GPS only.
    pub fn tracking_for(&self, kind: SensorKind) -> TrackingConfig {
        let period_ms = u64::try_from(self.tracking_interval.as_millis()).unwrap_or(u64::MAX);
        let trigger = match (kind, self.movement_min_m) {
            (SensorKind::Gps, Some(min_distance_m)) => TrackingTrigger::Movement {
                poll_ms: period_ms,
                min_distance_m,
            },
            _ => TrackingTrigger::Interval { period_ms },
        };
        TrackingConfig {
            trigger,
            channel_capacity: self.channel_capacity,
        }
    }

    /// Small, fast settings for in-process runs.
    pub fn for_testing(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            sensors: vec![SensorKind::Gps, SensorKind::Barometer],
            tracking_interval: Duration::from_millis(200),
            sampling: SamplingConfig::for_testing(),
            source_rate: Duration::from_millis(20),
            batch_size: 8,
            drain_interval: Duration::from_millis(300),
            submission: SubmissionConfig::for_testing(),
            channel_capacity: 8,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.sensors, vec![SensorKind::Gps, SensorKind::Barometer]);
        assert_eq!(config.batch_size, 32);
        assert!(config.ledger.auto_confirm);
        assert!(config.signer_seed.is_none());
    }

    #[test]
    fn test_overrides_applied() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("PS_DATA_DIR", "/var/lib/proofs"),
            ("PS_SENSORS", "Motion, network,motion"),
            ("PS_BATCH_SIZE", "4"),
            ("PS_DRAIN_INTERVAL_SECS", "5"),
            ("PS_MAX_RETRIES", "1"),
            ("PS_SAMPLE_WINDOW_MS", "250"),
            ("PS_LEDGER_AUTO_CONFIRM", "false"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/proofs"));
        assert_eq!(config.sensors, vec![SensorKind::Motion, SensorKind::Network]);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.drain_interval, Duration::from_secs(5));
        assert_eq!(config.submission.retry.max_retries, 1);
        assert_eq!(config.sampling.window_ms, 250);
        assert!(!config.ledger.auto_confirm);
    }

    #[test]
    fn test_unparseable_value_names_variable() {
        let err = RuntimeConfig::from_lookup(lookup(&[("PS_BATCH_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "PS_BATCH_SIZE"));
    }

    #[test]
    fn test_rejected_values() {
        assert!(matches!(
            RuntimeConfig::from_lookup(lookup(&[("PS_SENSORS", "sonar")])),
            Err(ConfigError::Invalid { .. })
        ));
        assert_eq!(
            RuntimeConfig::from_lookup(lookup(&[("PS_SENSORS", " , ")])).unwrap_err(),
            ConfigError::NoSensors
        );
        assert_eq!(
            RuntimeConfig::from_lookup(lookup(&[("PS_BATCH_SIZE", "0")])).unwrap_err(),
            ConfigError::Zero("PS_BATCH_SIZE")
        );
        assert_eq!(
            RuntimeConfig::from_lookup(lookup(&[("PS_SIGNER_SEED", "abcd")])).unwrap_err(),
            ConfigError::BadSeed
        );
    }

    #[test]
    fn test_movement_gating_only_for_gps() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("PS_MOVEMENT_MIN_M", "25"),
            ("PS_TRACKING_INTERVAL_MS", "1000"),
        ]))
        .unwrap();

        assert_eq!(
            config.tracking_for(SensorKind::Gps).trigger,
            TrackingTrigger::Movement {
                poll_ms: 1000,
                min_distance_m: 25.0,
            }
        );
        assert_eq!(
            config.tracking_for(SensorKind::Barometer).trigger,
            TrackingTrigger::Interval { period_ms: 1000 }
        );
    }
}
