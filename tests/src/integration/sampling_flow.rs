//! # Sampling Flow Tests
//!
//! Sensor callbacks through sampling and tracking into signed, queued proofs:
//!
//! ```text
//! SensorSource ──▶ SensorSampler (07) ──▶ Reading ──▶ Proof Builder (03) ──▶ Queue (05)
//!                    window + grace         │
//!                                           └── spawn_tracking: one per trigger tick
//! ```
//!
//! All tests run on paused tokio time so window and grace deadlines are exact.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ps_01_canonical_encoding::CanonicalFormat;
    use ps_02_key_custodian::{KeyCustodian, KeyCustodianApi, MockHardwareSigner};
    use ps_03_proof_builder::{verify_proof, ProofBuilder, ProofBuilderApi, ProofBuilderConfig};
    use ps_05_proof_queue::{InMemoryKVStore, ProofQueue, ProofQueueApi, QueueConfig, SubmissionState};
    use ps_07_sensor_sampling::{
        spawn_tracking, MockSensorSource, SamplingApi, SamplingConfig, SamplingError,
        SensorSample, SensorSampler, TrackingConfig, TrackingTrigger,
    };
    use shared_types::{
        DevicePublicKey, GpsFix, MockTimeSource, PressureSample, ReadingPayload, SensorKind,
    };
    use tokio::time::Instant;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const NOW: u64 = 1_700_000_000_000;

    type Custodian = KeyCustodian<MockHardwareSigner>;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn production_window() -> SamplingConfig {
        SamplingConfig {
            window_ms: 1_000,
            grace_ms: 2_000,
        }
    }

    fn fix(lat: f64, accuracy_m: f64, at: u64) -> SensorSample {
        SensorSample::new(
            ReadingPayload::Gps(GpsFix {
                latitude: lat,
                longitude: 121.0,
                altitude_m: None,
                accuracy_m: Some(accuracy_m),
                speed_mps: None,
            }),
            at,
        )
    }

    fn pressure(hpa: f64, at: u64) -> SensorSample {
        SensorSample::new(
            ReadingPayload::Barometer(PressureSample {
                pressure_hpa: hpa,
                relative_altitude_m: None,
            }),
            at,
        )
    }

    fn sampler(
        source: MockSensorSource,
        device: DevicePublicKey,
        config: SamplingConfig,
    ) -> Arc<SensorSampler<MockSensorSource>> {
        Arc::new(SensorSampler::new(Arc::new(source), device, config))
    }

    fn signer_stack(seed: u8) -> (Arc<Custodian>, ProofBuilder<Custodian, MockTimeSource>) {
        let custodian = Arc::new(KeyCustodian::new(MockHardwareSigner::new([seed; 32])));
        let builder = ProofBuilder::with_time_source(
            Arc::clone(&custodian),
            MockTimeSource::new(NOW),
            ProofBuilderConfig::for_testing(),
        );
        (custodian, builder)
    }

    // =============================================================================
    // BOUNDED WAIT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_silent_sensor_resolves_with_no_data_by_window_plus_grace() {
        let source = MockSensorSource::new();
        source.script(SensorKind::Gps, vec![]);
        let sampler = sampler(source, DevicePublicKey::from_bytes([1u8; 32]), production_window());

        let started = Instant::now();
        let err = sampler.sample(SensorKind::Gps).await.unwrap_err();
        let waited = started.elapsed();

        assert_eq!(
            err,
            SamplingError::NoData {
                kind: SensorKind::Gps,
                waited_ms: 3_000,
            }
        );
        assert!(waited <= ms(3_000), "waited {:?}", waited);
        assert!(waited >= ms(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_first_fix_is_taken_during_grace() {
        let source = MockSensorSource::new();
        source.script(SensorKind::Gps, vec![(ms(1_800), fix(14.6, 5.0, NOW - 50))]);
        let device = DevicePublicKey::from_bytes([1u8; 32]);
        let sampler = sampler(source, device, production_window());

        let started = Instant::now();
        let reading = sampler.sample(SensorKind::Gps).await.unwrap();
        assert_eq!(started.elapsed(), ms(1_800));
        assert_eq!(reading.device_id, device);
        assert_eq!(reading.captured_at_ms, NOW - 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_sensor_fails_without_waiting() {
        let sampler = sampler(
            MockSensorSource::new(),
            DevicePublicKey::from_bytes([1u8; 32]),
            production_window(),
        );
        let started = Instant::now();
        assert_eq!(
            sampler.sample(SensorKind::Magnetometer).await.unwrap_err(),
            SamplingError::Unavailable(SensorKind::Magnetometer)
        );
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    // =============================================================================
    // SAMPLE TO PROOF
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_window_of_fixes_becomes_one_signed_proof() {
        let (custodian, builder) = signer_stack(11);
        let handle = custodian.authorize().await.unwrap();

        let source = MockSensorSource::new();
        source.script(
            SensorKind::Gps,
            vec![
                (ms(100), fix(14.5990, 12.0, NOW - 900)),
                (ms(300), fix(14.5995, 6.0, NOW - 600)),
                (ms(300), fix(14.6000, 4.0, NOW - 300)),
            ],
        );
        let sampler = sampler(source, *handle.public_key(), production_window());

        let reading = sampler.sample(SensorKind::Gps).await.unwrap();
        // Latest fix in the window wins
        assert_eq!(reading.captured_at_ms, NOW - 300);
        match &reading.payload {
            ReadingPayload::Gps(gps) => assert_eq!(gps.latitude, 14.6000),
            other => panic!("expected gps payload, got {:?}", other),
        }

        let proof = builder.build_proof(reading, &handle).await.unwrap();
        assert!(verify_proof(&proof, CanonicalFormat::default()));
        assert_eq!(proof.signer_key(), handle.public_key());
    }

    #[tokio::test(start_paused = true)]
    async fn test_barometer_window_is_averaged_before_signing() {
        let (custodian, builder) = signer_stack(12);
        let handle = custodian.authorize().await.unwrap();

        let source = MockSensorSource::new();
        source.script(
            SensorKind::Barometer,
            vec![
                (ms(10), pressure(1000.0, NOW - 30)),
                (ms(10), pressure(1002.0, NOW - 20)),
                (ms(10), pressure(1004.0, NOW - 10)),
            ],
        );
        let sampler = sampler(source, *handle.public_key(), SamplingConfig::for_testing());

        let reading = sampler.sample(SensorKind::Barometer).await.unwrap();
        match &reading.payload {
            ReadingPayload::Barometer(p) => assert_eq!(p.pressure_hpa, 1002.0),
            other => panic!("expected barometer payload, got {:?}", other),
        }
        let proof = builder.build_proof(reading, &handle).await.unwrap();
        assert_eq!(proof.reading().captured_at_ms, NOW - 10);
    }

    // =============================================================================
    // TRACKING TO QUEUE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_tracking_feeds_queue_until_stopped() {
        let (custodian, builder) = signer_stack(13);
        let handle = custodian.authorize().await.unwrap();

        let source = MockSensorSource::new();
        source.script(SensorKind::Barometer, vec![(ms(20), pressure(1013.25, NOW - 5))]);
        let sampler = sampler(source, *handle.public_key(), SamplingConfig::for_testing());
        let queue = ProofQueue::new(InMemoryKVStore::new(), QueueConfig::default());

        let (tracker, mut readings) = spawn_tracking(
            Arc::clone(&sampler),
            SensorKind::Barometer,
            TrackingConfig::for_testing(),
        )
        .unwrap();

        for _ in 0..3 {
            let reading = readings.recv().await.unwrap();
            let proof = builder.build_proof(reading, &handle).await.unwrap();
            queue.append(proof).unwrap();
        }
        let summary = tracker.shutdown().await;
        while let Some(reading) = readings.recv().await {
            let proof = builder.build_proof(reading, &handle).await.unwrap();
            queue.append(proof).unwrap();
        }

        // Identical readings hash to one digest
        assert!(summary.emitted >= 3);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.list_by_state(SubmissionState::Pending).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_movement_tracking_needs_real_displacement() {
        let source = MockSensorSource::new();
        source.script(SensorKind::Gps, vec![(ms(10), fix(14.6, 5.0, NOW - 1))]);
        let sampler = sampler(
            source,
            DevicePublicKey::from_bytes([2u8; 32]),
            SamplingConfig::for_testing(),
        );
        let config = TrackingConfig {
            trigger: TrackingTrigger::Movement {
                poll_ms: 500,
                min_distance_m: 25.0,
            },
            channel_capacity: 4,
        };

        let (tracker, mut readings) = spawn_tracking(sampler, SensorKind::Gps, config).unwrap();
        readings.recv().await.unwrap();
        tokio::time::sleep(ms(5_000)).await;
        let summary = tracker.shutdown().await;

        // A device that never moves emits its first fix only
        assert_eq!(summary.emitted, 1);
        assert!(summary.stationary >= 5);
    }
}
