//! HTTP Route Handlers

pub mod air_quality;
pub mod system;
