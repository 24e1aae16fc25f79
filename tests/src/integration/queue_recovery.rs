//! # Queue Recovery Tests
//!
//! The durable queue across process restarts and between devices:
//!
//! 1. **Restart**: a file-backed queue reopened mid-lifecycle keeps every
//!    record in the state it reached, and submission resumes from there
//! 2. **Merge**: a snapshot exported from one queue merges into another,
//!    more advanced states winning

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use ps_02_key_custodian::{KeyCustodian, KeyCustodianApi, KeyHandle, MockHardwareSigner};
    use ps_03_proof_builder::{ProofBuilder, ProofBuilderApi, ProofBuilderConfig};
    use ps_05_proof_queue::{
        FileBackedKVStore, InMemoryKVStore, ProofQueue, ProofQueueApi, QueueConfig, QueueError,
        SubmissionState,
    };
    use ps_06_submission::{
        LedgerStatus, MockLedgerTransport, SubmissionApi, SubmissionConfig, SubmissionService,
    };
    use shared_types::{
        LedgerReference, MockTimeSource, NetworkQuality, Reading, ReadingPayload, SignedProof,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const NOW: u64 = 1_700_000_000_000;

    type Custodian = KeyCustodian<MockHardwareSigner>;
    type FileQueue = ProofQueue<FileBackedKVStore>;

    async fn signed(count: u64) -> Vec<SignedProof> {
        let custodian = Arc::new(KeyCustodian::new(MockHardwareSigner::new([21u8; 32])));
        let handle: KeyHandle = custodian.authorize().await.unwrap();
        let builder = ProofBuilder::with_time_source(
            Arc::clone(&custodian),
            MockTimeSource::new(NOW),
            ProofBuilderConfig::for_testing(),
        );

        let mut proofs = Vec::new();
        for i in 0..count {
            let reading = Reading::new(
                ReadingPayload::Network(NetworkQuality {
                    connection: "wifi".into(),
                    signal_dbm: Some(-60 - i as i64),
                    download_mbps: None,
                    latency_ms: Some(18.0),
                    carrier: None,
                }),
                NOW - 1_000 + i,
                *handle.public_key(),
            );
            proofs.push(builder.build_proof(reading, &handle).await.unwrap());
        }
        proofs
    }

    fn open(dir: &Path) -> Arc<FileQueue> {
        Arc::new(ProofQueue::open_dir(dir, QueueConfig::default()).unwrap())
    }

    fn service(
        transport: &Arc<MockLedgerTransport>,
        queue: &Arc<FileQueue>,
    ) -> SubmissionService<MockLedgerTransport, FileQueue> {
        SubmissionService::new(
            Arc::clone(transport),
            Arc::clone(queue),
            SubmissionConfig::for_testing(),
        )
    }

    // =============================================================================
    // RESTART
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_restart_mid_lifecycle_resumes_where_it_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let proofs = signed(5).await;
        let transport = Arc::new(MockLedgerTransport::new());

        {
            let queue = open(dir.path());
            queue.append_many(proofs.clone()).unwrap();
            let submitter = service(&transport, &queue);
            // Two go out before the "crash"
            let drained = submitter.drain_pending(2).await.unwrap();
            assert_eq!(drained.submitted, 2);
        }

        let queue = open(dir.path());
        assert_eq!(queue.len(), 5);
        let stats = queue.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.pending, 3);

        let submitter = service(&transport, &queue);
        let drained = submitter.drain_pending(10).await.unwrap();
        assert_eq!(drained.submitted, 3);

        transport.set_status(&LedgerReference::new("tx_1"), LedgerStatus::Confirmed);
        transport.set_status(&LedgerReference::new("tx_2"), LedgerStatus::Confirmed);
        let refresh = submitter.refresh_statuses().await.unwrap();
        assert_eq!(refresh.confirmed, 5);

        for proof in &proofs {
            let stored = queue.get(proof.digest()).unwrap();
            assert_eq!(stored.state(), SubmissionState::Confirmed);
            assert_eq!(stored.proof(), proof);
        }
    }

    #[tokio::test]
    async fn test_second_open_of_locked_directory_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let _first = open(dir.path());
        assert!(matches!(
            ProofQueue::open_dir(dir.path(), QueueConfig::default()),
            Err(QueueError::Locked(_))
        ));
    }

    #[tokio::test]
    async fn test_compaction_after_restart_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let queue = open(dir.path());
            queue.append_many(signed(3).await).unwrap();
        }
        let queue = open(dir.path());
        let report = queue.compact().unwrap();
        assert_eq!(report.scanned, 3);
        assert!(!report.changed());
    }

    // =============================================================================
    // MERGE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_merge_keeps_most_advanced_state() {
        let dir = tempfile::tempdir().unwrap();
        let proofs = signed(4).await;

        // Source: first two submitted under tx_1
        let source = open(dir.path());
        source.append_many(proofs[..3].to_vec()).unwrap();
        let transport = Arc::new(MockLedgerTransport::new());
        service(&transport, &source).drain_pending(2).await.unwrap();

        // Target: holds everything but only as pending, plus one it alone has
        let target = ProofQueue::new(InMemoryKVStore::new(), QueueConfig::default());
        target.append_many(proofs.clone()).unwrap();
        target.mark_submitted(proofs[0].digest(), LedgerReference::new("tx_1")).unwrap();
        target.mark_confirmed(proofs[0].digest()).unwrap();

        let report = target.import_merging(&source.export_all()).unwrap();
        // proofs[0]: confirmed locally, never replaced
        // proofs[1]: submitted beats pending
        // proofs[2]: both pending, equal
        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.rejected, 0);

        assert_eq!(target.get(proofs[0].digest()).unwrap().state(), SubmissionState::Confirmed);
        let merged = target.get(proofs[1].digest()).unwrap();
        assert_eq!(merged.state(), SubmissionState::Submitted);
        assert_eq!(merged.ledger_reference(), Some(&LedgerReference::new("tx_1")));
        assert_eq!(target.get(proofs[3].digest()).unwrap().state(), SubmissionState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_into_empty_queue_survives_restart() {
        let proofs = signed(3).await;
        let source = ProofQueue::new(InMemoryKVStore::new(), QueueConfig::default());
        source.append_many(proofs.clone()).unwrap();
        let snapshot = source.export_all();

        let dir = tempfile::tempdir().unwrap();
        {
            let target = open(dir.path());
            assert_eq!(target.import_merging(&snapshot).unwrap().inserted, 3);
            // Importing the same snapshot again changes nothing
            assert_eq!(target.import_merging(&snapshot).unwrap().unchanged, 3);
        }
        let reopened = open(dir.path());
        assert_eq!(reopened.list_pending(10).len(), 3);
        assert_eq!(reopened.stats().oldest_unsubmitted_ms, Some(NOW - 1_000));
    }
}
