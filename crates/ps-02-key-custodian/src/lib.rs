//! # PS-02 Key Custodian Interface
//!
//! Capability-scoped boundary to the external hardware-backed signer.
//!
//! **Stage:** 02
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Session State Machine
//!
//! ```text
//!                 authorize()                      sign() + stale token
//!  Unauthorized ──────────────▶ Authorized ──┐    (refresh, retry once)
//!       ▲                          │  ▲      │
//!       │      deauthorize()       │  └──────┘
//!       └──────────────────────────┘
//! ```
//!
//! Callers hold an explicit [`KeyHandle`]. The custodian keeps only cached
//! session data (the current token) behind an internal lock. A handle from a
//! previous session is rejected after `deauthorize`.
//!
//! ## Module Structure
//!
//! ```text
//! ps-02-key-custodian/
//! ├── domain/      # KeyHandle, AuthToken, SessionState, CustodianError
//! ├── ports/       # KeyCustodianApi (inbound), HardwareSigner (outbound) + mock
//! ├── adapters/    # SoftwareSigner: in-process Ed25519 signer with expiring tokens
//! ├── service.rs   # KeyCustodian: session cache + stale-token retry
//! └── config.rs    # SoftwareSignerConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::SoftwareSigner;
pub use config::SoftwareSignerConfig;
pub use domain::{AuthToken, CustodianError, KeyHandle, SessionState, SignerGrant};
pub use ports::{HardwareSigner, KeyCustodianApi, MockHardwareSigner};
pub use service::KeyCustodian;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
