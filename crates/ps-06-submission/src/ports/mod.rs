//! # Ports Layer
//!
//! - **Inbound (Driving)**: `SubmissionApi`
//! - **Outbound (Driven)**: `LedgerTransport`

pub mod inbound;
pub mod outbound;

pub use inbound::SubmissionApi;
pub use outbound::{LedgerTransport, MockLedgerTransport};
