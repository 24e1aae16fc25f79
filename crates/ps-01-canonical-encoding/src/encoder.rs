//! Reading → canonical bytes.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};
use shared_crypto::keccak256;
use shared_types::{DevicePublicKey, FieldValue, ProofDigest, Reading, ReadingPayload, SensorKind};

use crate::errors::EncodingError;
use crate::format::{write_length_prefixed, CanonicalFormat, DELIMITER};

/// Stateless encoder bound to one layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalEncoder {
    format: CanonicalFormat,
}

impl CanonicalEncoder {
    /// Encoder producing `format`.
    pub fn new(format: CanonicalFormat) -> Self {
        Self { format }
    }

    /// Layout this encoder produces.
    pub fn format(&self) -> CanonicalFormat {
        self.format
    }

    /// Canonical bytes of `reading`.
    pub fn encode(&self, reading: &Reading) -> Result<Vec<u8>, EncodingError> {
        let payload = canonical_payload_json(&reading.payload)?;
        let kind = reading.kind().as_str();
        let ts = reading.captured_at_ms.to_string();
        let device = reading.device_id.to_base58();

        match self.format {
            CanonicalFormat::LengthPrefixed => Ok(write_length_prefixed(&[
                kind.as_bytes(),
                ts.as_bytes(),
                payload.as_bytes(),
                device.as_bytes(),
            ])),
            CanonicalFormat::Delimited => {
                if payload.contains(DELIMITER) {
                    let field = first_colliding_field(&reading.payload);
                    return Err(EncodingError::DelimiterCollision { field });
                }
                Ok(format!("{kind}{DELIMITER}{ts}{DELIMITER}{payload}{DELIMITER}{device}").into_bytes())
            }
        }
    }

    /// Digest of `reading` under this encoder's layout.
    pub fn digest(&self, reading: &Reading) -> Result<ProofDigest, EncodingError> {
        self.encode(reading).map(|bytes| digest_of(&bytes))
    }
}

/// Canonical bytes of `reading` in the default layout.
pub fn encode(reading: &Reading) -> Result<Vec<u8>, EncodingError> {
    CanonicalEncoder::default().encode(reading)
}

/// Encode a reading delivered as an untyped field map.
pub fn encode_untyped(
    kind: SensorKind,
    fields: &Map<String, Value>,
    captured_at_ms: u64,
    device_id: DevicePublicKey,
) -> Result<Vec<u8>, EncodingError> {
    let reading = Reading::from_fields(kind, fields, captured_at_ms, device_id)?;
    encode(&reading)
}

/// `keccak256(bytes)` as a proof digest.
pub fn digest_of(bytes: &[u8]) -> ProofDigest {
    ProofDigest::from_bytes(keccak256(bytes))
}

/// Digest of `reading` in the default layout.
pub fn compute_digest(reading: &Reading) -> Result<ProofDigest, EncodingError> {
    CanonicalEncoder::default().digest(reading)
}

/// Sorted-key, minified JSON of the payload fields.
pub fn canonical_payload_json(payload: &ReadingPayload) -> Result<String, EncodingError> {
    let mut sorted = BTreeMap::new();
    for (name, value) in payload.fields() {
        let json = match value {
            FieldValue::Number(n) => {
                // -0.0 and 0.0 are the same measurement
                let n = if n == 0.0 { 0.0 } else { n };
                Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| EncodingError::NonFiniteNumber {
                        field: name.to_string(),
                    })?
            }
            FieldValue::Integer(i) => Value::from(i),
            FieldValue::Text(s) => Value::String(s),
        };
        sorted.insert(name, json);
    }
    serde_json::to_string(&sorted).map_err(|e| EncodingError::InvalidPayload(e.to_string()))
}

fn first_colliding_field(payload: &ReadingPayload) -> String {
    payload
        .fields()
        .into_iter()
        .find_map(|(name, value)| match value {
            FieldValue::Text(s) if s.contains(DELIMITER) => Some(name.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::split_length_prefixed;
    use proptest::prelude::*;
    use serde_json::json;
    use shared_types::{GpsFix, MotionSample, NetworkQuality};

    fn device() -> DevicePublicKey {
        DevicePublicKey::from_bytes([42u8; 32])
    }

    fn gps(lat: f64, lon: f64, ts: u64) -> Reading {
        Reading::new(
            ReadingPayload::Gps(GpsFix {
                latitude: lat,
                longitude: lon,
                altitude_m: Some(12.5),
                accuracy_m: None,
                speed_mps: None,
            }),
            ts,
            device(),
        )
    }

    fn network(connection: &str, carrier: Option<&str>) -> Reading {
        Reading::new(
            ReadingPayload::Network(NetworkQuality {
                connection: connection.to_string(),
                signal_dbm: Some(-71),
                download_mbps: Some(48.25),
                latency_ms: None,
                carrier: carrier.map(str::to_string),
            }),
            1_700_000_000_000,
            device(),
        )
    }

    // ========== Test Group 1: Determinism ==========

    #[test]
    fn test_repeated_encoding_is_identical() {
        let reading = gps(14.5, 121.0, 1_700_000_000_000);
        assert_eq!(encode(&reading).unwrap(), encode(&reading).unwrap());
    }

    #[test]
    fn test_field_insertion_order_is_irrelevant() {
        let a = json!({"latitude": 1.25, "longitude": 2.5, "altitude_m": 3.0});
        let b = json!({"altitude_m": 3.0, "longitude": 2.5, "latitude": 1.25});
        let (Value::Object(a), Value::Object(b)) = (a, b) else {
            unreachable!()
        };

        let ea = encode_untyped(SensorKind::Gps, &a, 5, device()).unwrap();
        let eb = encode_untyped(SensorKind::Gps, &b, 5, device()).unwrap();
        assert_eq!(ea, eb);
    }

    #[test]
    fn test_payload_json_is_sorted_and_minified() {
        let json = canonical_payload_json(&gps(1.5, -2.0, 0).payload).unwrap();
        assert_eq!(json, r#"{"altitude_m":12.5,"latitude":1.5,"longitude":-2.0}"#);
    }

    #[test]
    fn test_negative_zero_folds_to_zero() {
        let a = canonical_payload_json(&gps(0.0, 1.0, 0).payload).unwrap();
        let b = canonical_payload_json(&gps(-0.0, 1.0, 0).payload).unwrap();
        assert_eq!(a, b);
    }

    // ========== Test Group 2: Layouts ==========

    #[test]
    fn test_length_prefixed_fields() {
        let reading = gps(1.5, -2.0, 1_700_000_000_123);
        let bytes = encode(&reading).unwrap();
        let fields = split_length_prefixed(&bytes).unwrap();

        assert_eq!(fields[0], b"gps");
        assert_eq!(fields[1], b"1700000000123");
        assert_eq!(fields[3], device().to_base58().as_bytes());
    }

    #[test]
    fn test_delimited_matches_ledger_message() {
        let reading = gps(1.5, -2.0, 7);
        let bytes = CanonicalEncoder::new(CanonicalFormat::Delimited)
            .encode(&reading)
            .unwrap();
        let expected = format!(
            "gps|7|{{\"altitude_m\":12.5,\"latitude\":1.5,\"longitude\":-2.0}}|{}",
            device().to_base58()
        );
        assert_eq!(bytes, expected.into_bytes());
    }

    #[test]
    fn test_delimiter_in_text_field() {
        let reading = network("wifi", Some("acme|mobile"));

        // Length prefixing has no reserved bytes
        assert!(encode(&reading).is_ok());

        assert_eq!(
            CanonicalEncoder::new(CanonicalFormat::Delimited).encode(&reading),
            Err(EncodingError::DelimiterCollision {
                field: "carrier".into()
            })
        );
    }

    #[test]
    fn test_field_boundaries_cannot_shift() {
        // Same concatenated text, different split between fields
        let a = network("wifi", Some("ab"));
        let b = network("wifia", Some("b"));
        assert_ne!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    // ========== Test Group 3: Rejections ==========

    #[test]
    fn test_nested_payload_rejected() {
        let Value::Object(map) = json!({"latitude": 1.0, "longitude": [2.0]}) else {
            unreachable!()
        };
        assert_eq!(
            encode_untyped(SensorKind::Gps, &map, 0, device()),
            Err(EncodingError::NonScalarValue {
                field: "longitude".into()
            })
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let reading = Reading::new(
            ReadingPayload::Motion(MotionSample {
                accel_x: f64::INFINITY,
                accel_y: 0.0,
                accel_z: 9.81,
                gyro_x: 0.0,
                gyro_y: 0.0,
                gyro_z: 0.0,
            }),
            0,
            device(),
        );
        assert_eq!(
            encode(&reading),
            Err(EncodingError::NonFiniteNumber {
                field: "accel_x".into()
            })
        );
    }

    // ========== Test Group 4: Digest ==========

    #[test]
    fn test_digest_is_hash_of_encoding() {
        let reading = gps(3.0, 4.0, 99);
        let bytes = encode(&reading).unwrap();
        assert_eq!(compute_digest(&reading).unwrap(), digest_of(&bytes));
    }

    #[test]
    fn test_digest_changes_with_any_field() {
        let base = compute_digest(&gps(3.0, 4.0, 99)).unwrap();
        assert_ne!(base, compute_digest(&gps(3.0, 4.0, 100)).unwrap());
        assert_ne!(base, compute_digest(&gps(3.0, 4.5, 99)).unwrap());

        let mut other_device = gps(3.0, 4.0, 99);
        other_device.device_id = DevicePublicKey::from_bytes([1u8; 32]);
        assert_ne!(base, compute_digest(&other_device).unwrap());
    }

    fn field_map(fields: Vec<(&'static str, Value)>) -> Map<String, Value> {
        fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn gps_fields() -> impl Strategy<Value = Vec<(&'static str, Value)>> {
        (
            -90.0f64..90.0,
            -180.0f64..180.0,
            -400.0f64..9_000.0,
            0.5f64..100.0,
            0.0f64..60.0,
        )
            .prop_map(|(lat, lon, alt, acc, speed)| {
                vec![
                    ("latitude", json!(lat)),
                    ("longitude", json!(lon)),
                    ("altitude_m", json!(alt)),
                    ("accuracy_m", json!(acc)),
                    ("speed_mps", json!(speed)),
                ]
            })
    }

    fn network_fields() -> impl Strategy<Value = Vec<(&'static str, Value)>> {
        (
            prop::sample::select(vec!["wifi", "cellular", "ethernet"]),
            -120i64..-30,
            0.0f64..1_000.0,
            1.0f64..500.0,
            "[a-z]{1,12}",
        )
            .prop_map(|(connection, dbm, down, latency, carrier)| {
                vec![
                    ("connection", json!(connection)),
                    ("signal_dbm", json!(dbm)),
                    ("download_mbps", json!(down)),
                    ("latency_ms", json!(latency)),
                    ("carrier", json!(carrier)),
                ]
            })
    }

    proptest! {
        #[test]
        fn prop_gps_encoding_ignores_field_order(
            (fields, shuffled) in gps_fields()
                .prop_flat_map(|f| (Just(f.clone()), Just(f).prop_shuffle())),
            ts in 0u64..4_000_000_000_000,
        ) {
            let expected = encode_untyped(SensorKind::Gps, &field_map(fields), ts, device()).unwrap();
            let reordered = encode_untyped(SensorKind::Gps, &field_map(shuffled), ts, device()).unwrap();
            prop_assert_eq!(expected, reordered);
        }

        #[test]
        fn prop_network_encoding_ignores_field_order(
            (fields, shuffled) in network_fields()
                .prop_flat_map(|f| (Just(f.clone()), Just(f).prop_shuffle())),
            ts in 0u64..4_000_000_000_000,
        ) {
            let expected = encode_untyped(SensorKind::Network, &field_map(fields), ts, device()).unwrap();
            let reordered =
                encode_untyped(SensorKind::Network, &field_map(shuffled), ts, device()).unwrap();
            prop_assert_eq!(expected, reordered);
        }
    }
}
