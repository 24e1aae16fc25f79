//! # Domain Layer
//!
//! Session entities and the custodian error taxonomy.

pub mod entities;
pub mod errors;

pub use entities::{AuthToken, KeyHandle, SessionState, SignerGrant};
pub use errors::CustodianError;
