//! # Sensor Adapters

pub mod synthetic;

pub use synthetic::SyntheticSensorSource;
