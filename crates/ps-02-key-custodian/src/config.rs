//! # Software Signer Configuration

use serde::{Deserialize, Serialize};

/// Token policy of the in-process signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareSignerConfig {
    /// Token lifetime in milliseconds.
    pub token_ttl_ms: u64,
    /// Signing calls allowed per token. `None` means unlimited.
    pub max_uses_per_token: Option<u32>,
}

impl Default for SoftwareSignerConfig {
    fn default() -> Self {
        Self {
            token_ttl_ms: 5 * 60 * 1000,
            max_uses_per_token: None,
        }
    }
}

impl SoftwareSignerConfig {
    /// Single-use tokens, so every second signature goes through a refresh.
    pub fn for_testing() -> Self {
        Self {
            token_ttl_ms: 60_000,
            max_uses_per_token: Some(1),
        }
    }
}
