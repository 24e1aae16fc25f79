//! # Key Custodian Service
//!
//! Implements `KeyCustodianApi` on top of a `HardwareSigner`.
//!
//! The session lock is never held across an `.await`: state is read, the
//! lock released, the signer called, and the result written back.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_crypto::verify_ed25519;
use shared_types::{DevicePublicKey, SignatureBytes};
use tracing::{debug, info, warn};

use crate::domain::{AuthToken, CustodianError, KeyHandle, SessionState};
use crate::ports::inbound::KeyCustodianApi;
use crate::ports::outbound::HardwareSigner;

/// Session-caching custodian.
pub struct KeyCustodian<S: HardwareSigner> {
    signer: S,
    session: Mutex<SessionState>,
}

impl<S: HardwareSigner> KeyCustodian<S> {
    /// Create an unauthorized custodian over `signer`.
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            session: Mutex::new(SessionState::Unauthorized),
        }
    }

    /// Underlying signer.
    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Public key of the active session.
    pub fn public_key(&self) -> Option<DevicePublicKey> {
        self.session.lock().handle().map(|h| *h.public_key())
    }

    /// Token refreshes performed in the active session.
    pub fn refresh_count(&self) -> u32 {
        match &*self.session.lock() {
            SessionState::Authorized { refreshes, .. } => *refreshes,
            SessionState::Unauthorized => 0,
        }
    }

    fn current_token(&self, handle: &KeyHandle) -> Result<AuthToken, CustodianError> {
        match &*self.session.lock() {
            SessionState::Authorized {
                handle: active,
                token,
                ..
            } if active == handle => Ok(token.clone()),
            _ => Err(CustodianError::NotAuthorized),
        }
    }

    /// Replace the session token after a stale-token failure.
    async fn refresh(&self, handle: &KeyHandle) -> Result<AuthToken, CustodianError> {
        let grant = self.signer.request_authorization().await?;
        if grant.public_key != *handle.public_key() {
            return Err(CustodianError::SigningError(format!(
                "signer key changed during refresh ({} -> {})",
                handle.public_key(),
                grant.public_key
            )));
        }

        let mut session = self.session.lock();
        match &mut *session {
            SessionState::Authorized {
                handle: active,
                token,
                refreshes,
            } if *active == *handle => {
                *token = grant.token.clone();
                *refreshes += 1;
                Ok(grant.token)
            }
            // Deauthorized while we were waiting on the signer
            _ => Err(CustodianError::NotAuthorized),
        }
    }
}

#[async_trait]
impl<S: HardwareSigner> KeyCustodianApi for KeyCustodian<S> {
    async fn authorize(&self) -> Result<KeyHandle, CustodianError> {
        if let Some(handle) = self.session.lock().handle() {
            return Ok(handle.clone());
        }

        let grant = self.signer.request_authorization().await?;

        let mut session = self.session.lock();
        if let Some(handle) = session.handle() {
            // A concurrent authorize won; keep its session
            return Ok(handle.clone());
        }
        let handle = KeyHandle::new(grant.public_key);
        info!(
            "[ps-02] Custodian authorized for device {} (session {})",
            grant.public_key,
            handle.session_id()
        );
        *session = SessionState::Authorized {
            handle: handle.clone(),
            token: grant.token,
            refreshes: 0,
        };
        Ok(handle)
    }

    async fn sign(&self, handle: &KeyHandle, message: &[u8]) -> Result<SignatureBytes, CustodianError> {
        let token = self.current_token(handle)?;

        match self.signer.sign_with_token(&token, message).await {
            Ok(signature) => Ok(signature),
            Err(CustodianError::StaleToken) => {
                debug!("[ps-02] Stale token for session {}, refreshing", handle.session_id());
                let fresh = self.refresh(handle).await?;
                self.signer
                    .sign_with_token(&fresh, message)
                    .await
                    .map_err(|e| match e {
                        CustodianError::StaleToken => {
                            CustodianError::SigningError("token rejected after refresh".into())
                        }
                        other => other,
                    })
            }
            Err(e) => Err(e),
        }
    }

    fn verify(&self, message: &[u8], signature: &SignatureBytes, public_key: &DevicePublicKey) -> bool {
        verify_ed25519(message, signature.as_bytes(), public_key.as_bytes())
    }

    async fn deauthorize(&self, handle: &KeyHandle) -> Result<(), CustodianError> {
        let token = {
            let mut session = self.session.lock();
            let token = match &*session {
                SessionState::Unauthorized => return Ok(()),
                SessionState::Authorized { handle: active, .. } if active != handle => {
                    return Err(CustodianError::InvalidHandle)
                }
                SessionState::Authorized { token, .. } => token.clone(),
            };
            *session = SessionState::Unauthorized;
            token
        };

        info!("[ps-02] Custodian session {} closed", handle.session_id());
        if let Err(e) = self.signer.revoke(&token).await {
            // Local session is already gone; the signer-side token will expire on its own
            warn!("[ps-02] Signer-side revoke failed: {}", e);
        }
        Ok(())
    }

    fn is_authorized(&self) -> bool {
        self.session.lock().is_authorized()
    }
}
