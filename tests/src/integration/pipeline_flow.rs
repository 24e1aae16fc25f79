//! # Pipeline Flow Tests
//!
//! Readings through every stage to the ledger:
//!
//! ```text
//! Reading ──▶ Proof Builder (03) ──▶ Proof Queue (05) ──▶ Submission (06)
//!               │ signs via (02)                           │ batches via (04)
//!               ▼                                          ▼
//!          SignedProof                          Ledger reference + root
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: three GPS readings batched under one reference
//! 2. **Ledger Verification**: in-memory ledger checks signatures and paths
//! 3. **Failure Separation**: a stored-but-unsubmitted proof is never lost

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ps_01_canonical_encoding::CanonicalFormat;
    use ps_02_key_custodian::{KeyCustodian, KeyCustodianApi, KeyHandle, MockHardwareSigner};
    use ps_03_proof_builder::{verify_proof, ProofBuilder, ProofBuilderApi, ProofBuilderConfig};
    use ps_04_merkle_aggregation::{leaf_hash, verify_inclusion, MerkleBatch};
    use ps_05_proof_queue::{InMemoryKVStore, ProofQueue, ProofQueueApi, QueueConfig, SubmissionState};
    use ps_06_submission::{
        InMemoryLedger, LedgerConfig, LedgerStatus, LedgerTransport, MockLedgerTransport,
        SubmissionApi, SubmissionConfig, SubmissionError, SubmissionService, TransportError,
    };
    use shared_types::{
        GpsFix, LedgerReference, MockTimeSource, Reading, ReadingPayload, SignatureBytes,
        SignedProof,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const NOW: u64 = 1_700_000_000_000;

    type Custodian = KeyCustodian<MockHardwareSigner>;
    type Builder = ProofBuilder<Custodian, MockTimeSource>;
    type Queue = ProofQueue<InMemoryKVStore>;

    struct Device {
        builder: Builder,
        handle: KeyHandle,
    }

    impl Device {
        async fn new(seed: u8) -> Self {
            let custodian = Arc::new(KeyCustodian::new(MockHardwareSigner::new([seed; 32])));
            let handle = custodian.authorize().await.unwrap();
            let builder = ProofBuilder::with_time_source(
                custodian,
                MockTimeSource::new(NOW),
                ProofBuilderConfig::for_testing(),
            );
            Self { builder, handle }
        }

        fn gps(&self, lat: f64, captured_at_ms: u64) -> Reading {
            Reading::new(
                ReadingPayload::Gps(GpsFix {
                    latitude: lat,
                    longitude: 120.98,
                    altitude_m: Some(12.0),
                    accuracy_m: Some(4.5),
                    speed_mps: None,
                }),
                captured_at_ms,
                *self.handle.public_key(),
            )
        }

        async fn prove(&self, lat: f64, captured_at_ms: u64) -> SignedProof {
            self.builder
                .build_proof(self.gps(lat, captured_at_ms), &self.handle)
                .await
                .unwrap()
        }
    }

    fn queue() -> Arc<Queue> {
        Arc::new(ProofQueue::new(InMemoryKVStore::new(), QueueConfig::default()))
    }

    fn ledger() -> Arc<InMemoryLedger<Arc<MockTimeSource>>> {
        Arc::new(InMemoryLedger::with_time_source(
            Arc::new(MockTimeSource::new(NOW)),
            LedgerConfig::for_testing(),
        ))
    }

    // =============================================================================
    // HAPPY PATH
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_three_gps_readings_batched_under_one_reference() {
        let device = Device::new(1).await;
        let proofs = vec![
            device.prove(14.5995, NOW - 3_000).await,
            device.prove(14.6001, NOW - 2_000).await,
            device.prove(14.6010, NOW - 1_000).await,
        ];
        for proof in &proofs {
            assert!(verify_proof(proof, CanonicalFormat::default()));
        }

        let batch = MerkleBatch::compute(&proofs).unwrap();
        let queue = queue();
        let transport = Arc::new(MockLedgerTransport::new());
        let service = SubmissionService::new(
            Arc::clone(&transport),
            Arc::clone(&queue),
            SubmissionConfig::for_testing(),
        );

        let receipt = service.submit_batch(&proofs).await.unwrap();
        assert_eq!(receipt.reference, LedgerReference::new("tx_1"));
        assert_eq!(receipt.root(), batch.merkle_root());

        for proof in &proofs {
            let stored = queue.get(proof.digest()).unwrap();
            assert_eq!(stored.state(), SubmissionState::Submitted);
            assert_eq!(stored.ledger_reference(), Some(&LedgerReference::new("tx_1")));
        }

        let path = batch.proof_path(1).unwrap();
        assert!(verify_inclusion(&leaf_hash(&proofs[1]), &path, 1, &batch.root()));
        assert!(!verify_inclusion(&leaf_hash(&proofs[0]), &path, 1, &batch.root()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_then_refresh_reaches_confirmed() {
        let device = Device::new(2).await;
        let queue = queue();
        for i in 0..5u64 {
            queue.append(device.prove(14.0 + i as f64 * 0.001, NOW - 5_000 + i).await).unwrap();
        }
        let ledger = ledger();
        let service = SubmissionService::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            SubmissionConfig::for_testing(),
        );
        ledger.register_device(*device.handle.public_key());

        let drained = service.drain_pending(10).await.unwrap();
        assert_eq!(drained.submitted, 5);

        let refresh = service.refresh_statuses().await.unwrap();
        assert_eq!(refresh.still_pending, 5);

        assert_eq!(ledger.finalize_pending(), 1);
        let refresh = service.refresh_statuses().await.unwrap();
        assert_eq!(refresh.confirmed, 5);
        assert_eq!(queue.stats().confirmed, 5);

        let stats = ledger.device_stats(device.handle.public_key()).unwrap();
        assert_eq!(stats.proof_count, 5);
        assert_eq!(stats.last_proof_timestamp, NOW - 5_000 + 4);
    }

    // =============================================================================
    // LEDGER VERIFICATION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_ledger_checks_inclusion_against_stored_root() {
        let device = Device::new(3).await;
        let mut proofs = Vec::new();
        for i in 0..7u64 {
            proofs.push(device.prove(10.0 + i as f64, NOW - 100 + i).await);
        }

        let queue = queue();
        let ledger = ledger();
        ledger.register_device(*device.handle.public_key());
        let service = SubmissionService::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            SubmissionConfig::for_testing(),
        );
        let receipt = service.submit_batch(&proofs).await.unwrap();
        assert_eq!(ledger.commitment_count(&receipt.reference), Some(7));

        for (i, proof) in proofs.iter().enumerate() {
            let path = receipt.batch.proof_path(i).unwrap();
            ledger
                .verify_inclusion(&receipt.reference, &leaf_hash(proof), &path, i)
                .unwrap();
        }

        let path = receipt.batch.proof_path(6).unwrap();
        assert!(ledger
            .verify_inclusion(&receipt.reference, &leaf_hash(&proofs[5]), &path, 6)
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_proof_signature_checked_by_ledger() {
        let device = Device::new(4).await;
        let ledger = ledger();
        ledger.register_device(*device.handle.public_key());
        let queue = queue();
        let service = SubmissionService::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            SubmissionConfig::for_testing(),
        );

        let good = device.prove(1.0, NOW - 10).await;
        let reference = service.submit_one(&good).await.unwrap();
        assert_eq!(ledger.recorded_digest(&reference), Some(*good.digest()));

        let other = device.prove(2.0, NOW - 5).await;
        let forged = SignedProof::from_parts(
            other.reading().clone(),
            SignatureBytes::from_bytes([0x11; 64]),
            *other.signer_key(),
            *other.digest(),
        );
        let err = service.submit_one(&forged).await.unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Transport {
                error: TransportError::Rejected(_),
                attempts: 1,
            }
        ));
    }

    // =============================================================================
    // FAILURE SEPARATION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_ledger_leaves_signed_proofs_stored() {
        let device = Device::new(5).await;
        let queue = queue();
        let proofs = vec![
            device.prove(1.0, NOW - 30).await,
            device.prove(2.0, NOW - 20).await,
        ];
        queue.append_many(proofs.clone()).unwrap();

        let transport = Arc::new(MockLedgerTransport::new());
        transport.fail_next(100);
        let service = SubmissionService::new(
            Arc::clone(&transport),
            Arc::clone(&queue),
            SubmissionConfig::for_testing(),
        );

        let drained = service.drain_pending(10).await.unwrap();
        assert_eq!(drained.failed, 2);
        assert!(drained.last_error.is_some());

        // Batch failure: proofs exist and stay submittable
        for proof in &proofs {
            let stored = queue.get(proof.digest()).unwrap();
            assert_eq!(stored.state(), SubmissionState::Pending);
        }

        transport.fail_next(0);
        let drained = service.drain_pending(10).await.unwrap();
        assert_eq!(drained.submitted, 2);
        assert_eq!(transport.commitments().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_revert_moves_record_to_failed_and_back() {
        let device = Device::new(6).await;
        let ledger = ledger();
        ledger.register_device(*device.handle.public_key());
        let queue = queue();
        let service = SubmissionService::new(
            Arc::clone(&ledger),
            Arc::clone(&queue),
            SubmissionConfig::for_testing(),
        );

        let proof = device.prove(3.0, NOW - 1).await;
        let reference = service.submit_one(&proof).await.unwrap();
        ledger.fail(&reference, "reorg").unwrap();
        assert_eq!(
            ledger.commitment_root(&reference),
            None,
            "single submissions carry no root"
        );

        let refresh = service.refresh_statuses().await.unwrap();
        assert_eq!(refresh.failed, 1);
        let stored = queue.get(proof.digest()).unwrap();
        assert_eq!(stored.state(), SubmissionState::Failed);

        // Failed records are picked up by the next drain
        let drained = service.drain_pending(4).await.unwrap();
        assert_eq!(drained.submitted, 1);
        assert_ne!(drained.reference, Some(reference.clone()));

        let status = ledger.get_status(&reference).await.unwrap();
        assert!(matches!(status, LedgerStatus::Failed(_)));
    }
}
