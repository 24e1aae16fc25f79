//! # Shared Crypto - Proof Pipeline Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Digests, Merkle leaves and nodes |
//! | `signatures` | Ed25519 | Device attestation signatures |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency at signing time
//! - **Keccak-256**: Same node hash the ledger program uses, so roots computed
//!   off-chain verify on-chain without translation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_many, keccak256_pair, Hash, KeccakHasher};
pub use signatures::{verify_ed25519, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
