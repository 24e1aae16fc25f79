//! # Sensor Sampler
//!
//! Implements `SamplingApi` over any `SensorSource`.
//!
//! ## Timing
//!
//! ```text
//! subscribe ──── window ────┬──────── grace ────────┐
//!   samples collected       │ only if window empty: │
//!                           │ wait for first sample │
//!                           ▼                       ▼
//!                  resolve with what arrived     NoData
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{DevicePublicKey, Reading, SensorKind};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::SamplingConfig;
use crate::domain::{aggregate, SamplingError, SensorSample};
use crate::ports::inbound::SamplingApi;
use crate::ports::outbound::SensorSource;

/// Samples one device's sensors with a bounded wait.
pub struct SensorSampler<S: SensorSource> {
    source: Arc<S>,
    device: DevicePublicKey,
    config: SamplingConfig,
}

impl<S: SensorSource> SensorSampler<S> {
    /// Sampler attributing readings to `device`.
    pub fn new(source: Arc<S>, device: DevicePublicKey, config: SamplingConfig) -> Self {
        Self {
            source,
            device,
            config,
        }
    }

    /// Underlying sensor source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Window settings.
    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }
}

#[async_trait]
impl<S: SensorSource> SamplingApi for SensorSampler<S> {
    async fn sample(&self, kind: SensorKind) -> Result<Reading, SamplingError> {
        let started = Instant::now();
        let no_data = SamplingError::NoData {
            kind,
            waited_ms: self.config.ceiling_ms(),
        };
        let ceiling = started + self.config.window() + self.config.grace();
        let mut rx = match timeout_at(ceiling, self.source.subscribe(kind)).await {
            Ok(subscription) => subscription?,
            Err(_) => {
                warn!("[ps-07] {} source did not answer within {} ms", kind, self.config.ceiling_ms());
                return Err(no_data);
            }
        };
        let deadline = started + self.config.window();

        let mut samples: Vec<SensorSample> = Vec::new();
        let mut closed = false;
        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(sample)) if sample.kind() == kind => samples.push(sample),
                Ok(Some(other)) => {
                    debug!("[ps-07] Dropping {} sample from {} subscription", other.kind(), kind)
                }
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        if samples.is_empty() && !closed {
            loop {
                match timeout_at(ceiling, rx.recv()).await {
                    Ok(Some(sample)) if sample.kind() == kind => {
                        samples.push(sample);
                        break;
                    }
                    Ok(Some(_)) => continue,
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }
        }
        drop(rx);

        match aggregate(&samples) {
            Some(sample) => {
                debug!(
                    "[ps-07] Sampled {} from {} callbacks at {}",
                    kind,
                    samples.len(),
                    sample.captured_at_ms
                );
                Ok(Reading::new(sample.payload, sample.captured_at_ms, self.device))
            }
            None if closed => {
                warn!("[ps-07] {} source closed before any sample", kind);
                Err(SamplingError::SourceClosed(kind))
            }
            None => {
                warn!("[ps-07] No {} data within {} ms", kind, self.config.ceiling_ms());
                Err(no_data)
            }
        }
    }

    fn device(&self) -> DevicePublicKey {
        self.device
    }
}
