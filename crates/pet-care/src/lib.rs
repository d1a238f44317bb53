//! Care scheduling and request lifecycle for the pet adoption marketplace.

pub mod care;
pub mod config;
pub mod error;
pub mod telemetry;
