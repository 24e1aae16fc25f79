//! # Proof Builder Service
//!
//! Implements `ProofBuilderApi` over any `KeyCustodianApi`.

use std::sync::Arc;

use async_trait::async_trait;
use ps_01_canonical_encoding::{digest_of, CanonicalEncoder, CanonicalFormat};
use ps_02_key_custodian::{KeyCustodianApi, KeyHandle};
use shared_crypto::verify_ed25519;
use shared_types::{Reading, SignedProof, SystemTimeSource, TimeSource};
use tracing::{debug, warn};

use crate::config::ProofBuilderConfig;
use crate::domain::{BatchBuildReport, ProofError, SkippedReading};
use crate::ports::inbound::ProofBuilderApi;

/// Check a proof without a custodian: re-encode, compare digest, verify
/// the signature against the embedded signer key.
pub fn verify_proof(proof: &SignedProof, format: CanonicalFormat) -> bool {
    let Ok(bytes) = CanonicalEncoder::new(format).encode(proof.reading()) else {
        return false;
    };
    digest_of(&bytes) == *proof.digest()
        && verify_ed25519(
            &bytes,
            proof.signature().as_bytes(),
            proof.signer_key().as_bytes(),
        )
}

/// Builds signed proofs from readings.
pub struct ProofBuilder<C: KeyCustodianApi, T: TimeSource = SystemTimeSource> {
    custodian: Arc<C>,
    time: T,
    encoder: CanonicalEncoder,
    config: ProofBuilderConfig,
}

impl<C: KeyCustodianApi> ProofBuilder<C, SystemTimeSource> {
    /// Builder using the system clock.
    pub fn new(custodian: Arc<C>, config: ProofBuilderConfig) -> Self {
        Self::with_time_source(custodian, SystemTimeSource, config)
    }
}

impl<C: KeyCustodianApi, T: TimeSource> ProofBuilder<C, T> {
    /// Builder using an explicit clock.
    pub fn with_time_source(custodian: Arc<C>, time: T, config: ProofBuilderConfig) -> Self {
        Self {
            custodian,
            time,
            encoder: CanonicalEncoder::new(config.format),
            config,
        }
    }

    /// Custodian used for signing.
    pub fn custodian(&self) -> &Arc<C> {
        &self.custodian
    }

    /// Active configuration.
    pub fn config(&self) -> &ProofBuilderConfig {
        &self.config
    }

    fn check_capture_time(&self, reading: &Reading) -> Result<(), ProofError> {
        let now_ms = self.time.now();
        if reading.captured_at_ms > now_ms.saturating_add(self.config.max_clock_skew_ms) {
            return Err(ProofError::TimestampInFuture {
                captured_at_ms: reading.captured_at_ms,
                now_ms,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<C: KeyCustodianApi, T: TimeSource> ProofBuilderApi for ProofBuilder<C, T> {
    async fn build_proof(&self, reading: Reading, handle: &KeyHandle) -> Result<SignedProof, ProofError> {
        if !self.custodian.is_authorized() {
            return Err(ProofError::NotAuthorized);
        }
        let signer = *handle.public_key();
        if reading.device_id != signer {
            return Err(ProofError::DeviceMismatch {
                reading: reading.device_id,
                signer,
            });
        }
        self.check_capture_time(&reading)?;

        let bytes = self.encoder.encode(&reading)?;
        let signature = self.custodian.sign(handle, &bytes).await?;
        let digest = digest_of(&bytes);

        debug!(
            "[ps-03] Built {} proof {} at {}",
            reading.kind(),
            digest,
            reading.captured_at_ms
        );
        Ok(SignedProof::from_parts(reading, signature, signer, digest))
    }

    fn verify_locally(&self, proof: &SignedProof) -> bool {
        let Ok(bytes) = self.encoder.encode(proof.reading()) else {
            return false;
        };
        digest_of(&bytes) == *proof.digest()
            && self
                .custodian
                .verify(&bytes, proof.signature(), proof.signer_key())
    }

    async fn build_batch_report(&self, readings: Vec<Reading>, handle: &KeyHandle) -> BatchBuildReport {
        let mut report = BatchBuildReport {
            proofs: Vec::with_capacity(readings.len()),
            skipped: Vec::new(),
        };

        for (index, reading) in readings.into_iter().enumerate() {
            match self.build_proof(reading, handle).await {
                Ok(proof) => report.proofs.push(proof),
                Err(error) => {
                    warn!("[ps-03] Skipping reading {} in batch: {}", index, error);
                    report.skipped.push(SkippedReading { index, error });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ps_02_key_custodian::{KeyCustodian, MockHardwareSigner};
    use shared_types::{
        DevicePublicKey, GpsFix, MockTimeSource, PressureSample, ReadingPayload, SignatureBytes,
    };
    use std::sync::atomic::Ordering;

    const NOW: u64 = 1_700_000_000_000;

    type Builder = ProofBuilder<KeyCustodian<MockHardwareSigner>, MockTimeSource>;

    fn builder() -> Builder {
        let custodian = Arc::new(KeyCustodian::new(MockHardwareSigner::new([11u8; 32])));
        ProofBuilder::with_time_source(
            custodian,
            MockTimeSource::new(NOW),
            ProofBuilderConfig::for_testing(),
        )
    }

    fn device(builder: &Builder) -> DevicePublicKey {
        builder.custodian().signer().public_key()
    }

    fn gps(device: DevicePublicKey, ts: u64, lat: f64) -> Reading {
        Reading::new(
            ReadingPayload::Gps(GpsFix {
                latitude: lat,
                longitude: 121.0,
                altitude_m: None,
                accuracy_m: Some(5.0),
                speed_mps: None,
            }),
            ts,
            device,
        )
    }

    // ========== Test Group 1: build_proof ==========

    #[tokio::test]
    async fn test_build_proof_signs_canonical_bytes() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        let reading = gps(device(&builder), NOW - 1_000, 14.6);

        let proof = builder.build_proof(reading.clone(), &handle).await.unwrap();

        let bytes = ps_01_canonical_encoding::encode(&reading).unwrap();
        assert_eq!(proof.reading(), &reading);
        assert_eq!(*proof.digest(), digest_of(&bytes));
        assert_eq!(proof.signer_key(), handle.public_key());
        assert!(builder.verify_locally(&proof));
        assert!(verify_proof(&proof, CanonicalFormat::LengthPrefixed));
    }

    #[tokio::test]
    async fn test_build_proof_requires_authorization() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        builder.custodian().deauthorize(&handle).await.unwrap();

        let result = builder.build_proof(gps(device(&builder), NOW, 1.0), &handle).await;

        assert_eq!(result, Err(ProofError::NotAuthorized));
        assert_eq!(builder.custodian().signer().sign_call_count(), 0);
    }

    #[tokio::test]
    async fn test_build_proof_rejects_foreign_device() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        let other = DevicePublicKey::from_bytes([1u8; 32]);

        let result = builder.build_proof(gps(other, NOW, 1.0), &handle).await;

        assert!(matches!(result, Err(ProofError::DeviceMismatch { .. })));
    }

    #[tokio::test]
    async fn test_build_proof_rejects_future_capture() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();

        let result = builder.build_proof(gps(device(&builder), NOW + 1, 1.0), &handle).await;

        assert_eq!(
            result,
            Err(ProofError::TimestampInFuture {
                captured_at_ms: NOW + 1,
                now_ms: NOW
            })
        );
    }

    #[tokio::test]
    async fn test_signing_failure_surfaces() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        builder.custodian().signer().fail_signing.store(true, Ordering::SeqCst);

        let result = builder.build_proof(gps(device(&builder), NOW, 1.0), &handle).await;

        assert!(matches!(result, Err(ProofError::SigningError(_))));
    }

    #[tokio::test]
    async fn test_non_finite_reading_is_encoding_error() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        let reading = Reading::new(
            ReadingPayload::Barometer(PressureSample {
                pressure_hpa: f64::NAN,
                relative_altitude_m: None,
            }),
            NOW,
            device(&builder),
        );

        let result = builder.build_proof(reading, &handle).await;

        assert!(matches!(result, Err(ProofError::Encoding(_))));
    }

    // ========== Test Group 2: verify_locally ==========

    #[tokio::test]
    async fn test_tampered_reading_fails_verification() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        let proof = builder
            .build_proof(gps(device(&builder), NOW, 14.6), &handle)
            .await
            .unwrap();

        let mut moved = proof.reading().clone();
        moved.captured_at_ms += 1;
        let tampered = SignedProof::from_parts(
            moved,
            *proof.signature(),
            *proof.signer_key(),
            *proof.digest(),
        );

        assert!(!builder.verify_locally(&tampered));
    }

    #[tokio::test]
    async fn test_garbage_signature_is_false_not_error() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        let proof = builder
            .build_proof(gps(device(&builder), NOW, 14.6), &handle)
            .await
            .unwrap();

        let forged = SignedProof::from_parts(
            proof.reading().clone(),
            SignatureBytes::from_bytes([0u8; 64]),
            *proof.signer_key(),
            *proof.digest(),
        );
        assert!(!builder.verify_locally(&forged));

        // Key that did not sign
        let bad_key = SignedProof::from_parts(
            proof.reading().clone(),
            *proof.signature(),
            DevicePublicKey::from_bytes([0xFF; 32]),
            *proof.digest(),
        );
        assert!(!builder.verify_locally(&bad_key));
    }

    // ========== Test Group 3: build_batch ==========

    #[tokio::test]
    async fn test_batch_skips_failures_and_keeps_order() {
        let builder = builder();
        let handle = builder.custodian().authorize().await.unwrap();
        let dev = device(&builder);
        let readings = vec![
            gps(dev, NOW - 3, 1.0),
            gps(dev, NOW + 10_000, 2.0),
            gps(dev, NOW - 1, 3.0),
        ];

        let report = builder.build_batch_report(readings.clone(), &handle).await;
        assert_eq!(report.proofs.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert!(!report.is_complete());
        assert_eq!(report.proofs[0].captured_at_ms(), NOW - 3);
        assert_eq!(report.proofs[1].captured_at_ms(), NOW - 1);

        let proofs = builder.build_batch(readings, &handle).await;
        assert_eq!(proofs.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_any_mutation_breaks_verification(lat in -89.0f64..89.0, delta in 0.001f64..1.0) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let builder = builder();
                let handle = builder.custodian().authorize().await.unwrap();
                let proof = builder
                    .build_proof(gps(device(&builder), NOW, lat), &handle)
                    .await
                    .unwrap();
                prop_assert!(builder.verify_locally(&proof));

                let mutated = gps(device(&builder), NOW, lat + delta);
                let tampered = SignedProof::from_parts(
                    mutated,
                    *proof.signature(),
                    *proof.signer_key(),
                    *proof.digest(),
                );
                prop_assert!(!builder.verify_locally(&tampered));
                Ok(())
            })?;
        }
    }
}
