//! # Ports Layer
//!
//! - **Inbound (Driving)**: `SamplingApi`
//! - **Outbound (Driven)**: `SensorSource`

pub mod inbound;
pub mod outbound;

pub use inbound::SamplingApi;
pub use outbound::{MockSensorSource, SensorSource};
