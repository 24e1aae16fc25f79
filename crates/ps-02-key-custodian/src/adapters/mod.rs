//! # Adapters
//!
//! Concrete `HardwareSigner` implementations.

pub mod software;

pub use software::SoftwareSigner;
