//! # Outbound Ports (Driven Ports / SPI)
//!
//! The external hardware-backed signer. This crate does not define its
//! protocol, only that it issues tokens and returns 64-byte Ed25519
//! signatures.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use shared_crypto::Ed25519KeyPair;
use shared_types::{DevicePublicKey, SignatureBytes};

use crate::domain::{AuthToken, CustodianError, SignerGrant};

/// External hardware-backed signer.
#[async_trait]
pub trait HardwareSigner: Send + Sync {
    /// Ask the signer for a session token. May prompt the user.
    ///
    /// # Errors
    /// * `CustodianError::AuthorizationDeclined` - user or signer refused
    async fn request_authorization(&self) -> Result<SignerGrant, CustodianError>;

    /// Sign `message` under `token`.
    ///
    /// # Errors
    /// * `CustodianError::StaleToken` - token expired or was invalidated
    /// * `CustodianError::SigningError` - signer failed
    async fn sign_with_token(
        &self,
        token: &AuthToken,
        message: &[u8],
    ) -> Result<SignatureBytes, CustodianError>;

    /// Revoke `token` on the signer side.
    async fn revoke(&self, token: &AuthToken) -> Result<(), CustodianError>;
}

/// Scriptable signer for tests.
///
/// Signs for real with a seeded key, so signatures verify.
pub struct MockHardwareSigner {
    keypair: Ed25519KeyPair,
    /// Refuse the next authorization requests.
    pub decline: AtomicBool,
    /// Number of upcoming `sign_with_token` calls that report a stale token.
    pub stale_responses: AtomicU32,
    /// Fail every signing call.
    pub fail_signing: AtomicBool,
    authorizations: AtomicU32,
    sign_calls: AtomicU32,
    revocations: AtomicU32,
}

impl MockHardwareSigner {
    /// Mock signing with the key derived from `seed`.
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            keypair: Ed25519KeyPair::from_seed(seed),
            decline: AtomicBool::new(false),
            stale_responses: AtomicU32::new(0),
            fail_signing: AtomicBool::new(false),
            authorizations: AtomicU32::new(0),
            sign_calls: AtomicU32::new(0),
            revocations: AtomicU32::new(0),
        }
    }

    /// Public key of the mock's signing key.
    pub fn public_key(&self) -> DevicePublicKey {
        DevicePublicKey::from_bytes(*self.keypair.public_key().as_bytes())
    }

    /// Make the next `n` signing calls report a stale token.
    pub fn expire_next(&self, n: u32) {
        self.stale_responses.store(n, Ordering::SeqCst);
    }

    /// Successful and declined authorization requests so far.
    pub fn authorization_count(&self) -> u32 {
        self.authorizations.load(Ordering::SeqCst)
    }

    /// Signing calls so far, including failed ones.
    pub fn sign_call_count(&self) -> u32 {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Revocations so far.
    pub fn revocation_count(&self) -> u32 {
        self.revocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HardwareSigner for MockHardwareSigner {
    async fn request_authorization(&self) -> Result<SignerGrant, CustodianError> {
        let n = self.authorizations.fetch_add(1, Ordering::SeqCst);
        if self.decline.load(Ordering::SeqCst) {
            return Err(CustodianError::AuthorizationDeclined("user rejected".into()));
        }
        Ok(SignerGrant {
            token: AuthToken::new(format!("mock-token-{}", n)),
            public_key: self.public_key(),
        })
    }

    async fn sign_with_token(
        &self,
        _token: &AuthToken,
        message: &[u8],
    ) -> Result<SignatureBytes, CustodianError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);

        let stale = self
            .stale_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Err(CustodianError::StaleToken);
        }
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(CustodianError::SigningError("secure element unavailable".into()));
        }

        Ok(SignatureBytes::from_bytes(*self.keypair.sign(message).as_bytes()))
    }

    async fn revoke(&self, _token: &AuthToken) -> Result<(), CustodianError> {
        self.revocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
