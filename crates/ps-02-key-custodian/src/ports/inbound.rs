//! # Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use shared_types::{DevicePublicKey, SignatureBytes};

use crate::domain::{CustodianError, KeyHandle};

/// Key custodian API.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait KeyCustodianApi: Send + Sync {
    /// Start a session, or return the cached handle if one is active.
    ///
    /// May wait on external user approval.
    async fn authorize(&self) -> Result<KeyHandle, CustodianError>;

    /// Sign `message` with the key behind `handle`.
    ///
    /// A stale token is refreshed and the call retried exactly once; a
    /// second failure is returned as `SigningError`.
    async fn sign(&self, handle: &KeyHandle, message: &[u8]) -> Result<SignatureBytes, CustodianError>;

    /// Verify an Ed25519 signature. Pure and local.
    fn verify(&self, message: &[u8], signature: &SignatureBytes, public_key: &DevicePublicKey) -> bool;

    /// End the session. `sign` fails until `authorize` is called again.
    async fn deauthorize(&self, handle: &KeyHandle) -> Result<(), CustodianError>;

    /// Whether a session is active.
    fn is_authorized(&self) -> bool;
}
