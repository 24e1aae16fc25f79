//! # Ports Layer
//!
//! - **Inbound (Driving)**: `ProofBuilderApi`
//! - **Outbound (Driven)**: `KeyCustodianApi` (PS-02) and `TimeSource`

pub mod inbound;

pub use inbound::ProofBuilderApi;
pub use ps_02_key_custodian::KeyCustodianApi;
pub use shared_types::TimeSource;
