//! # Ledger Adapters

pub mod ledger;

pub use ledger::InMemoryLedger;
