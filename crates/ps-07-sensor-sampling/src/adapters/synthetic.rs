//! Synthetic sensors for running the pipeline without hardware.
//!
//! GPS follows a random walk shared by all subscriptions, so movement
//! tracking sees the device travel. Other kinds are noise around a fixed
//! baseline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use shared_types::{
    GpsFix, MagneticField, MotionSample, NetworkQuality, PressureSample, ReadingPayload, SensorKind,
    SystemTimeSource, TimeSource,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{SamplingError, SensorSample};
use crate::ports::outbound::SensorSource;

/// Metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, Copy)]
struct Position {
    latitude: f64,
    longitude: f64,
}

/// Software sensor source.
pub struct SyntheticSensorSource<T: TimeSource + 'static = SystemTimeSource> {
    time: Arc<T>,
    rate: Duration,
    max_step_m: f64,
    position: Arc<Mutex<Position>>,
}

impl SyntheticSensorSource<SystemTimeSource> {
    /// Source starting at the given coordinates, one sample per `rate`.
    pub fn new(latitude: f64, longitude: f64, rate: Duration) -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource), latitude, longitude, rate)
    }
}

impl<T: TimeSource + 'static> SyntheticSensorSource<T> {
    /// Source on an explicit clock.
    pub fn with_time_source(time: Arc<T>, latitude: f64, longitude: f64, rate: Duration) -> Self {
        Self {
            time,
            rate: rate.max(Duration::from_millis(1)),
            max_step_m: 15.0,
            position: Arc::new(Mutex::new(Position {
                latitude,
                longitude,
            })),
        }
    }

    /// Largest GPS step between two samples, in metres.
    pub fn with_max_step_m(mut self, metres: f64) -> Self {
        self.max_step_m = metres.max(0.0);
        self
    }
}

fn walk(position: &Mutex<Position>, max_step_m: f64) -> GpsFix {
    let mut rng = rand::thread_rng();
    let mut p = position.lock();
    if max_step_m > 0.0 {
        let north = rng.gen_range(-max_step_m..=max_step_m);
        let east = rng.gen_range(-max_step_m..=max_step_m);
        p.latitude = (p.latitude + north / METRES_PER_DEGREE).clamp(-89.9, 89.9);
        p.longitude += east / (METRES_PER_DEGREE * p.latitude.to_radians().cos());
    }
    GpsFix {
        latitude: p.latitude,
        longitude: p.longitude,
        altitude_m: Some(rng.gen_range(10.0..12.0)),
        accuracy_m: Some(rng.gen_range(3.0..8.0)),
        speed_mps: None,
    }
}

fn generate(kind: SensorKind, position: &Mutex<Position>, max_step_m: f64) -> ReadingPayload {
    let mut rng = rand::thread_rng();
    match kind {
        SensorKind::Gps => ReadingPayload::Gps(walk(position, max_step_m)),
        SensorKind::Motion => ReadingPayload::Motion(MotionSample {
            accel_x: rng.gen_range(-0.2..0.2),
            accel_y: rng.gen_range(-0.2..0.2),
            accel_z: 9.81 + rng.gen_range(-0.1..0.1),
            gyro_x: rng.gen_range(-0.01..0.01),
            gyro_y: rng.gen_range(-0.01..0.01),
            gyro_z: rng.gen_range(-0.01..0.01),
        }),
        SensorKind::Magnetometer => ReadingPayload::Magnetometer(MagneticField {
            x_ut: 22.0 + rng.gen_range(-1.0..1.0),
            y_ut: 5.0 + rng.gen_range(-1.0..1.0),
            z_ut: -42.0 + rng.gen_range(-1.0..1.0),
            heading_deg: Some(rng.gen_range(0.0..360.0)),
        }),
        SensorKind::Barometer => ReadingPayload::Barometer(PressureSample {
            pressure_hpa: 1013.25 + rng.gen_range(-0.5..0.5),
            relative_altitude_m: None,
        }),
        SensorKind::Network => ReadingPayload::Network(NetworkQuality {
            connection: "wifi".into(),
            signal_dbm: Some(rng.gen_range(-75..-45)),
            download_mbps: Some(rng.gen_range(20.0..120.0)),
            latency_ms: Some(rng.gen_range(8.0..40.0)),
            carrier: None,
        }),
    }
}

#[async_trait]
impl<T: TimeSource + 'static> SensorSource for SyntheticSensorSource<T> {
    async fn subscribe(&self, kind: SensorKind) -> Result<mpsc::Receiver<SensorSample>, SamplingError> {
        let (tx, rx) = mpsc::channel(16);
        let time = Arc::clone(&self.time);
        let position = Arc::clone(&self.position);
        let (rate, max_step_m) = (self.rate, self.max_step_m);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(rate);
            loop {
                ticker.tick().await;
                let sample = SensorSample::new(generate(kind, &position, max_step_m), time.now());
                if tx.send(sample).await.is_err() {
                    break;
                }
            }
            debug!("[ps-07] Synthetic {} subscription ended", kind);
        });
        Ok(rx)
    }
}
