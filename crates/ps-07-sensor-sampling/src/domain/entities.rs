//! Sampling entities and window aggregation.

use shared_types::{
    GpsFix, MagneticField, MotionSample, PressureSample, ReadingPayload, SensorKind, Timestamp,
};

/// Mean Earth radius used by `haversine_m`, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// One callback from a sensor source.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    /// Typed measurement.
    pub payload: ReadingPayload,
    /// When the source took it, epoch ms.
    pub captured_at_ms: Timestamp,
}

impl SensorSample {
    /// Sample taken at `captured_at_ms`.
    pub fn new(payload: ReadingPayload, captured_at_ms: Timestamp) -> Self {
        Self {
            payload,
            captured_at_ms,
        }
    }

    /// Kind of the payload.
    pub fn kind(&self) -> SensorKind {
        self.payload.kind()
    }
}

/// How several samples of one window become one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Field-wise arithmetic mean.
    Mean,
    /// Most recent sample.
    Latest,
}

impl Aggregation {
    /// Continuous signals are averaged; fixes and link state are taken as last seen.
    pub fn for_kind(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Motion | SensorKind::Magnetometer | SensorKind::Barometer => {
                Aggregation::Mean
            }
            SensorKind::Gps | SensorKind::Network => Aggregation::Latest,
        }
    }
}

/// Collapse a window's samples into one.
///
/// Samples of another kind than the first are ignored. The result carries
/// the latest capture time in the window. `None` for an empty window.
pub fn aggregate(samples: &[SensorSample]) -> Option<SensorSample> {
    let kind = samples.first()?.kind();
    let same: Vec<&SensorSample> = samples.iter().filter(|s| s.kind() == kind).collect();
    let latest = same.iter().max_by_key(|s| s.captured_at_ms)?;

    let payload = match Aggregation::for_kind(kind) {
        Aggregation::Latest => latest.payload.clone(),
        Aggregation::Mean => mean_payload(&same)?,
    };
    Some(SensorSample::new(payload, latest.captured_at_ms))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0u32), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / f64::from(n)
    }
}

fn mean_opt(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(mean(present.into_iter()))
    }
}

/// Circular mean of compass headings, in `[0, 360)`.
///
/// `None` when no sample has a heading or the headings cancel out.
fn mean_heading(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sin, cos, n) = values
        .flatten()
        .map(f64::to_radians)
        .fold((0.0, 0.0, 0u32), |(s, c, n), a| (s + a.sin(), c + a.cos(), n + 1));
    if n == 0 || sin.hypot(cos) < 1e-9 * f64::from(n) {
        return None;
    }
    Some(sin.atan2(cos).to_degrees().rem_euclid(360.0))
}

fn mean_payload(samples: &[&SensorSample]) -> Option<ReadingPayload> {
    let motion = || {
        samples.iter().filter_map(|s| match &s.payload {
            ReadingPayload::Motion(m) => Some(m),
            _ => None,
        })
    };
    let magnetic = || {
        samples.iter().filter_map(|s| match &s.payload {
            ReadingPayload::Magnetometer(m) => Some(m),
            _ => None,
        })
    };
    let pressure = || {
        samples.iter().filter_map(|s| match &s.payload {
            ReadingPayload::Barometer(p) => Some(p),
            _ => None,
        })
    };

    match samples.first()?.payload {
        ReadingPayload::Motion(_) => Some(ReadingPayload::Motion(MotionSample {
            accel_x: mean(motion().map(|m| m.accel_x)),
            accel_y: mean(motion().map(|m| m.accel_y)),
            accel_z: mean(motion().map(|m| m.accel_z)),
            gyro_x: mean(motion().map(|m| m.gyro_x)),
            gyro_y: mean(motion().map(|m| m.gyro_y)),
            gyro_z: mean(motion().map(|m| m.gyro_z)),
        })),
        ReadingPayload::Magnetometer(_) => Some(ReadingPayload::Magnetometer(MagneticField {
            x_ut: mean(magnetic().map(|m| m.x_ut)),
            y_ut: mean(magnetic().map(|m| m.y_ut)),
            z_ut: mean(magnetic().map(|m| m.z_ut)),
            heading_deg: mean_heading(magnetic().map(|m| m.heading_deg)),
        })),
        ReadingPayload::Barometer(_) => Some(ReadingPayload::Barometer(PressureSample {
            pressure_hpa: mean(pressure().map(|p| p.pressure_hpa)),
            relative_altitude_m: mean_opt(pressure().map(|p| p.relative_altitude_m)),
        })),
        ReadingPayload::Gps(_) | ReadingPayload::Network(_) => None,
    }
}

/// Great-circle distance between two fixes, in metres.
pub fn haversine_m(a: &GpsFix, b: &GpsFix) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
