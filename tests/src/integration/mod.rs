//! # Cross-Stage Integration Tests
//!
//! - `pipeline_flow` - reading to ledger reference, batching and inclusion
//! - `sampling_flow` - sensor callbacks through sampling and tracking
//! - `queue_recovery` - restart and snapshot merge of the durable queue

pub mod pipeline_flow;
pub mod queue_recovery;
pub mod sampling_flow;
