//! # Ports Layer
//!
//! - **Inbound (Driving)**: `KeyCustodianApi`, what the proof builder calls
//! - **Outbound (Driven)**: `HardwareSigner`, the external custodian

pub mod inbound;
pub mod outbound;

pub use inbound::KeyCustodianApi;
pub use outbound::{HardwareSigner, MockHardwareSigner};
