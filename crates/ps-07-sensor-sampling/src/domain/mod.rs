//! # Domain Layer

pub mod entities;
pub mod errors;

pub use entities::{aggregate, haversine_m, Aggregation, SensorSample, EARTH_RADIUS_M};
pub use errors::SamplingError;
