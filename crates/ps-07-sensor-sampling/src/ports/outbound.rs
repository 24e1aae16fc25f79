//! # Outbound Ports (Driven Ports / SPI)
//!
//! Platform sensors. A subscription is a channel of samples; dropping the
//! receiver ends it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::SensorKind;
use tokio::sync::mpsc;

use crate::domain::{SamplingError, SensorSample};

/// Source of sensor callbacks.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Start delivering samples of `kind`.
    async fn subscribe(&self, kind: SensorKind) -> Result<mpsc::Receiver<SensorSample>, SamplingError>;
}

/// Scripted source for tests.
///
/// Each subscription replays the script for its kind: every sample is sent
/// after its delay (relative to the previous one). The channel then stays
/// open until the subscriber drops it, unless `close_after_script` is set.
#[derive(Default)]
pub struct MockSensorSource {
    scripts: Mutex<HashMap<SensorKind, Vec<(Duration, SensorSample)>>>,
    /// Close the channel once the script has been sent.
    pub close_after_script: bool,
    subscriptions: AtomicU32,
}

impl MockSensorSource {
    /// Source with no scripted sensors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the script for `kind`.
    pub fn script(&self, kind: SensorKind, samples: Vec<(Duration, SensorSample)>) {
        self.scripts.lock().insert(kind, samples);
    }

    /// Subscriptions opened so far.
    pub fn subscription_count(&self) -> u32 {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for MockSensorSource {
    async fn subscribe(&self, kind: SensorKind) -> Result<mpsc::Receiver<SensorSample>, SamplingError> {
        let script = self
            .scripts
            .lock()
            .get(&kind)
            .cloned()
            .ok_or(SamplingError::Unavailable(kind))?;
        self.subscriptions.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(script.len().max(1));
        let close = self.close_after_script;
        tokio::spawn(async move {
            for (delay, sample) in script {
                tokio::time::sleep(delay).await;
                if tx.send(sample).await.is_err() {
                    return;
                }
            }
            if !close {
                tx.closed().await;
            }
        });
        Ok(rx)
    }
}
