//! Session entities.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::DevicePublicKey;
use uuid::Uuid;

/// Capability returned by `authorize`, required by every `sign` call.
///
/// Carries no secret material: the session id ties it to one custodian
/// session and the public key identifies the signing device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHandle {
    session_id: Uuid,
    public_key: DevicePublicKey,
}

impl KeyHandle {
    pub(crate) fn new(public_key: DevicePublicKey) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            public_key,
        }
    }

    /// Session this handle belongs to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Public key of the signing device.
    pub fn public_key(&self) -> &DevicePublicKey {
        &self.public_key
    }
}

/// Short-lived token issued by the external signer.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap an opaque token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Opaque token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are bearer credentials
        f.write_str("AuthToken(***)")
    }
}

/// What the external signer hands back on a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerGrant {
    /// Token to present with each signing request.
    pub token: AuthToken,
    /// Public key of the authorized signing key.
    pub public_key: DevicePublicKey,
}

/// Cached session inside the custodian.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session.
    #[default]
    Unauthorized,
    /// Active session.
    Authorized {
        /// Handle given to callers.
        handle: KeyHandle,
        /// Current signer token; replaced on refresh.
        token: AuthToken,
        /// Number of token refreshes in this session.
        refreshes: u32,
    },
}

impl SessionState {
    /// Whether a session is active.
    pub fn is_authorized(&self) -> bool {
        matches!(self, SessionState::Authorized { .. })
    }

    /// Handle of the active session, if any.
    pub fn handle(&self) -> Option<&KeyHandle> {
        match self {
            SessionState::Authorized { handle, .. } => Some(handle),
            SessionState::Unauthorized => None,
        }
    }
}
