//! # Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use shared_types::{DevicePublicKey, Reading, SensorKind};

use crate::domain::SamplingError;

/// Bounded sampling of one sensor.
#[async_trait]
pub trait SamplingApi: Send + Sync {
    /// Collect samples of `kind` for one window and resolve them to a
    /// reading for this device.
    ///
    /// Never waits longer than window plus grace. Fails with `NoData` when
    /// nothing arrived in that time.
    async fn sample(&self, kind: SensorKind) -> Result<Reading, SamplingError>;

    /// Device the readings are attributed to.
    fn device(&self) -> DevicePublicKey;
}
