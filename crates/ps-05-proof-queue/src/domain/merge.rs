//! Merge rule for two records with the same digest.
//!
//! Used by snapshot import and by compaction.

use super::entities::{StoredProof, SubmissionState};

/// Whether `incoming` should replace `existing`.
///
/// A `Confirmed` record is never replaced. A `Failed` record carrying the
/// same ledger reference as a `Submitted` one is the later of the two and
/// wins. Otherwise the higher state rank wins, and on equal rank the later
/// `submitted_at_ms` wins.
pub fn prefer_incoming(existing: &StoredProof, incoming: &StoredProof) -> bool {
    if existing.state() == SubmissionState::Confirmed {
        return false;
    }
    if rejected_after(incoming, existing) {
        return true;
    }
    if rejected_after(existing, incoming) {
        return false;
    }
    match incoming.state().rank().cmp(&existing.state().rank()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => incoming.submitted_at_ms() > existing.submitted_at_ms(),
    }
}

/// `failed` is the ledger's rejection of the submission `submitted` records.
fn rejected_after(failed: &StoredProof, submitted: &StoredProof) -> bool {
    failed.state() == SubmissionState::Failed
        && submitted.state() == SubmissionState::Submitted
        && failed.ledger_reference().is_some()
        && failed.ledger_reference() == submitted.ledger_reference()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        DevicePublicKey, LedgerReference, NetworkQuality, ProofDigest, Reading, ReadingPayload,
        SignatureBytes, SignedProof,
    };

    fn pending() -> StoredProof {
        let device = DevicePublicKey::from_bytes([6u8; 32]);
        StoredProof::new(SignedProof::from_parts(
            Reading::new(
                ReadingPayload::Network(NetworkQuality {
                    connection: "wifi".into(),
                    signal_dbm: Some(-60),
                    download_mbps: None,
                    latency_ms: None,
                    carrier: None,
                }),
                1_000,
                device,
            ),
            SignatureBytes::from_bytes([0u8; 64]),
            device,
            ProofDigest::from_bytes([1u8; 32]),
        ))
    }

    fn submitted(at: u64) -> StoredProof {
        let mut r = pending();
        r.submit(LedgerReference::from("tx_1"), None, at).unwrap();
        r
    }

    #[test]
    fn test_higher_rank_wins() {
        assert!(prefer_incoming(&pending(), &submitted(5)));
        assert!(!prefer_incoming(&submitted(5), &pending()));
    }

    #[test]
    fn test_confirmed_never_replaced() {
        let mut confirmed = submitted(5);
        confirmed.confirm().unwrap();
        let mut also_confirmed = submitted(9);
        also_confirmed.confirm().unwrap();

        assert!(!prefer_incoming(&confirmed, &also_confirmed));
        assert!(!prefer_incoming(&confirmed, &pending()));
    }

    #[test]
    fn test_ledger_failure_beats_its_own_submission() {
        let mut rejected = submitted(5);
        rejected.fail("reverted".into()).unwrap();

        assert!(!prefer_incoming(&rejected, &submitted(5)));
        assert!(prefer_incoming(&submitted(5), &rejected));
    }

    #[test]
    fn test_resubmission_beats_earlier_failure() {
        let mut rejected = submitted(5);
        rejected.fail("reverted".into()).unwrap();
        let mut resent = pending();
        resent.submit(LedgerReference::from("tx_2"), None, 9).unwrap();

        assert!(prefer_incoming(&rejected, &resent));

        let mut send_failed = pending();
        send_failed.fail("timeout".into()).unwrap();
        assert!(prefer_incoming(&send_failed, &submitted(5)));
    }

    #[test]
    fn test_equal_rank_later_submission_wins() {
        assert!(prefer_incoming(&submitted(5), &submitted(6)));
        assert!(!prefer_incoming(&submitted(6), &submitted(5)));
        assert!(!prefer_incoming(&pending(), &pending()));
    }
}
