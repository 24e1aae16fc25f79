//! # Software Signer
//!
//! In-process Ed25519 signer that behaves like a hardware custodian from the
//! caller's side: it issues expiring tokens and rejects stale ones. Used by
//! the runtime when no secure element is attached, and by tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_crypto::Ed25519KeyPair;
use shared_types::{DevicePublicKey, SignatureBytes};
use tracing::debug;
use uuid::Uuid;

use crate::config::SoftwareSignerConfig;
use crate::domain::{AuthToken, CustodianError, SignerGrant};
use crate::ports::outbound::HardwareSigner;

struct IssuedToken {
    expires_at: Instant,
    uses: u32,
}

/// Ed25519 signer holding its key in process memory.
pub struct SoftwareSigner {
    keypair: Ed25519KeyPair,
    config: SoftwareSignerConfig,
    tokens: Mutex<HashMap<String, IssuedToken>>,
}

impl SoftwareSigner {
    /// Signer over an existing key pair.
    pub fn new(keypair: Ed25519KeyPair, config: SoftwareSignerConfig) -> Self {
        Self {
            keypair,
            config,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Signer with a freshly generated key.
    pub fn generate(config: SoftwareSignerConfig) -> Self {
        Self::new(Ed25519KeyPair::generate(), config)
    }

    /// Public key of the held key pair.
    pub fn public_key(&self) -> DevicePublicKey {
        DevicePublicKey::from_bytes(*self.keypair.public_key().as_bytes())
    }

    /// Number of tokens currently issued and not revoked.
    pub fn live_tokens(&self) -> usize {
        let now = Instant::now();
        self.tokens
            .lock()
            .values()
            .filter(|t| t.expires_at > now)
            .count()
    }

    fn ttl(&self) -> Duration {
        Duration::from_millis(self.config.token_ttl_ms)
    }
}

#[async_trait]
impl HardwareSigner for SoftwareSigner {
    async fn request_authorization(&self) -> Result<SignerGrant, CustodianError> {
        let token = Uuid::new_v4().to_string();
        let now = Instant::now();

        let mut tokens = self.tokens.lock();
        tokens.retain(|_, t| t.expires_at > now);
        tokens.insert(
            token.clone(),
            IssuedToken {
                expires_at: now + self.ttl(),
                uses: 0,
            },
        );

        Ok(SignerGrant {
            token: AuthToken::new(token),
            public_key: self.public_key(),
        })
    }

    async fn sign_with_token(
        &self,
        token: &AuthToken,
        message: &[u8],
    ) -> Result<SignatureBytes, CustodianError> {
        {
            let mut tokens = self.tokens.lock();
            let Some(issued) = tokens.get_mut(token.as_str()) else {
                return Err(CustodianError::StaleToken);
            };
            if issued.expires_at <= Instant::now() {
                tokens.remove(token.as_str());
                debug!("[ps-02] Software signer token expired");
                return Err(CustodianError::StaleToken);
            }
            if let Some(max) = self.config.max_uses_per_token {
                if issued.uses >= max {
                    return Err(CustodianError::StaleToken);
                }
            }
            issued.uses += 1;
        }

        Ok(SignatureBytes::from_bytes(*self.keypair.sign(message).as_bytes()))
    }

    async fn revoke(&self, token: &AuthToken) -> Result<(), CustodianError> {
        self.tokens.lock().remove(token.as_str());
        Ok(())
    }
}
