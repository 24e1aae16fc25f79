//! Custodian error types.

use thiserror::Error;

/// Errors from the key custodian.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodianError {
    /// No active session. Recoverable by authorizing again.
    #[error("Custodian is not authorized")]
    NotAuthorized,

    /// The user or custodian declined the authorization request.
    #[error("Authorization declined: {0}")]
    AuthorizationDeclined(String),

    /// The session token expired between calls.
    ///
    /// Handled inside the custodian by one transparent refresh; callers see
    /// it only from the raw signer port.
    #[error("Authorization token is stale")]
    StaleToken,

    /// The custodian rejected or failed the signing call.
    #[error("Signing failed: {0}")]
    SigningError(String),

    /// The handle does not belong to the active session.
    #[error("Key handle does not match the active session")]
    InvalidHandle,
}

impl CustodianError {
    /// Whether re-authorizing may clear this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CustodianError::NotAuthorized | CustodianError::StaleToken | CustodianError::SigningError(_)
        )
    }
}
