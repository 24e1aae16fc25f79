//! # Ports Layer
//!
//! - **Inbound (Driving)**: `ProofQueueApi`
//! - **Outbound (Driven)**: `KeyValueStore`

pub mod inbound;
pub mod outbound;

pub use inbound::ProofQueueApi;
pub use outbound::{BatchOperation, KeyValueStore, ScanResult};
