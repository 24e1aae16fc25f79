//! # PS-07 Sensor Sampling
//!
//! Turns platform sensor callbacks into `Reading`s without ever waiting on
//! hardware indefinitely.
//!
//! **Stage:** 07
//! **Depends on:** shared types (reading shape)
//!
//! ## Window Aggregation
//!
//! | Kind | Several samples in one window |
//! |------|-------------------------------|
//! | gps | latest fix |
//! | motion | field-wise mean |
//! | magnetometer | field-wise mean |
//! | barometer | field-wise mean |
//! | network | latest |
//!
//! ## Tracking
//!
//! `spawn_tracking` runs a task on an interval or movement trigger. The
//! returned handle's `stop` prevents any further sample from starting.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod tracking;

pub use adapters::SyntheticSensorSource;
pub use config::{SamplingConfig, TrackingConfig, TrackingTrigger};
pub use domain::{aggregate, haversine_m, Aggregation, SamplingError, SensorSample};
pub use ports::{MockSensorSource, SamplingApi, SensorSource};
pub use service::SensorSampler;
pub use tracking::{spawn_tracking, TrackingHandle, TrackingSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
