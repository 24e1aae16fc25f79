//! # Pipeline Container
//!
//! Configuration and the stage instances built from it.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, RuntimeConfig};
pub use pipeline::{ContainerError, PipelineContainer};
