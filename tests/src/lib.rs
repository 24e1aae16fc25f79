//! # Sensor Proof Test Suite
//!
//! Scenarios that span more than one pipeline stage. Per-stage unit tests
//! live next to the code they test.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/      # Cross-stage scenarios
//! │   ├── pipeline_flow.rs
//! │   ├── sampling_flow.rs
//! │   └── queue_recovery.rs
//! └── benches/
//!     └── pipeline_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All scenarios
//! cargo test -p ps-tests
//!
//! # One area
//! cargo test -p ps-tests integration::queue_recovery::
//!
//! # Benchmarks
//! cargo bench -p ps-tests
//! ```

pub mod integration;
