//! # Sensor Payloads
//!
//! One record shape per sensor kind. Payloads are flat: every field is a
//! scalar (number or string), optional fields are omitted rather than null.
//!
//! `ReadingPayload::fields` lists the populated fields in a fixed order; the
//! canonical encoder sorts them by name, so the listing order is irrelevant
//! to the encoded bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::PayloadError;

/// Enumerated sensor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Satellite position fix.
    Gps,
    /// Accelerometer + gyroscope.
    Motion,
    /// Magnetic field vector.
    Magnetometer,
    /// Barometric pressure.
    Barometer,
    /// Network connection quality.
    Network,
}

impl SensorKind {
    /// Every kind, in declaration order.
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Gps,
        SensorKind::Motion,
        SensorKind::Magnetometer,
        SensorKind::Barometer,
        SensorKind::Network,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Gps => "gps",
            SensorKind::Motion => "motion",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Barometer => "barometer",
            SensorKind::Network => "network",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| PayloadError::UnknownKind(s.to_string()))
    }
}

/// A scalar payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Floating point measurement.
    Number(f64),
    /// Integral measurement.
    Integer(i64),
    /// Text value (connection type, carrier name).
    Text(String),
}

// =============================================================================
// PER-KIND RECORDS
// =============================================================================

/// Satellite position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
}

/// Accelerometer (m/s²) and gyroscope (rad/s) sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionSample {
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
}

/// Magnetic field in microtesla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MagneticField {
    pub x_ut: f64,
    pub y_ut: f64,
    pub z_ut: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
}

/// Barometric pressure sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PressureSample {
    pub pressure_hpa: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_altitude_m: Option<f64>,
}

/// Network connection quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkQuality {
    /// `wifi`, `cellular`, `ethernet` or `none`.
    pub connection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_dbm: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_mbps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

// =============================================================================
// TAGGED UNION
// =============================================================================

/// Typed payload, keyed by sensor kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum ReadingPayload {
    Gps(GpsFix),
    Motion(MotionSample),
    Magnetometer(MagneticField),
    Barometer(PressureSample),
    Network(NetworkQuality),
}

fn push_opt(out: &mut Vec<(&'static str, FieldValue)>, name: &'static str, v: Option<f64>) {
    if let Some(v) = v {
        out.push((name, FieldValue::Number(v)));
    }
}

impl ReadingPayload {
    /// Sensor kind of this payload.
    pub fn kind(&self) -> SensorKind {
        match self {
            ReadingPayload::Gps(_) => SensorKind::Gps,
            ReadingPayload::Motion(_) => SensorKind::Motion,
            ReadingPayload::Magnetometer(_) => SensorKind::Magnetometer,
            ReadingPayload::Barometer(_) => SensorKind::Barometer,
            ReadingPayload::Network(_) => SensorKind::Network,
        }
    }

    /// Populated fields as `(name, value)` pairs.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        use FieldValue::Number;

        let mut out = Vec::with_capacity(6);
        match self {
            ReadingPayload::Gps(g) => {
                out.push(("latitude", Number(g.latitude)));
                out.push(("longitude", Number(g.longitude)));
                push_opt(&mut out, "altitude_m", g.altitude_m);
                push_opt(&mut out, "accuracy_m", g.accuracy_m);
                push_opt(&mut out, "speed_mps", g.speed_mps);
            }
            ReadingPayload::Motion(m) => {
                out.push(("accel_x", Number(m.accel_x)));
                out.push(("accel_y", Number(m.accel_y)));
                out.push(("accel_z", Number(m.accel_z)));
                out.push(("gyro_x", Number(m.gyro_x)));
                out.push(("gyro_y", Number(m.gyro_y)));
                out.push(("gyro_z", Number(m.gyro_z)));
            }
            ReadingPayload::Magnetometer(m) => {
                out.push(("x_ut", Number(m.x_ut)));
                out.push(("y_ut", Number(m.y_ut)));
                out.push(("z_ut", Number(m.z_ut)));
                push_opt(&mut out, "heading_deg", m.heading_deg);
            }
            ReadingPayload::Barometer(p) => {
                out.push(("pressure_hpa", Number(p.pressure_hpa)));
                push_opt(&mut out, "relative_altitude_m", p.relative_altitude_m);
            }
            ReadingPayload::Network(n) => {
                out.push(("connection", FieldValue::Text(n.connection.clone())));
                if let Some(dbm) = n.signal_dbm {
                    out.push(("signal_dbm", FieldValue::Integer(dbm)));
                }
                push_opt(&mut out, "download_mbps", n.download_mbps);
                push_opt(&mut out, "latency_ms", n.latency_ms);
                if let Some(carrier) = &n.carrier {
                    out.push(("carrier", FieldValue::Text(carrier.clone())));
                }
            }
        }
        out
    }

    /// Build a typed payload from an untyped flat field map.
    ///
    /// This is the entry point for platform sensor callbacks, which deliver
    /// loosely typed maps. Nested objects and arrays are rejected.
    pub fn from_fields(kind: SensorKind, fields: &Map<String, Value>) -> Result<Self, PayloadError> {
        for (name, value) in fields {
            match value {
                Value::Object(_) | Value::Array(_) => {
                    return Err(PayloadError::NonScalar {
                        field: name.clone(),
                    })
                }
                _ => {}
            }
        }

        let object = Value::Object(fields.clone());
        let shape_err = |e: serde_json::Error| PayloadError::Shape {
            kind: kind.to_string(),
            reason: e.to_string(),
        };

        let payload = match kind {
            SensorKind::Gps => ReadingPayload::Gps(serde_json::from_value(object).map_err(shape_err)?),
            SensorKind::Motion => {
                ReadingPayload::Motion(serde_json::from_value(object).map_err(shape_err)?)
            }
            SensorKind::Magnetometer => {
                ReadingPayload::Magnetometer(serde_json::from_value(object).map_err(shape_err)?)
            }
            SensorKind::Barometer => {
                ReadingPayload::Barometer(serde_json::from_value(object).map_err(shape_err)?)
            }
            SensorKind::Network => {
                ReadingPayload::Network(serde_json::from_value(object).map_err(shape_err)?)
            }
        };
        payload.check_finite()?;
        Ok(payload)
    }

    /// Reject NaN and infinite measurements.
    pub fn check_finite(&self) -> Result<(), PayloadError> {
        for (name, value) in self.fields() {
            if let FieldValue::Number(n) = value {
                if !n.is_finite() {
                    return Err(PayloadError::NonFinite {
                        field: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
