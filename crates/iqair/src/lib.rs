//! IQAir Provider Client
//!
//! This crate fetches nearest-city air quality readings from the IQAir
//! (AirVisual) API and reshapes them into the live reading envelope
//! served by the API.

mod client;
mod error;
mod pollution;
mod source;

pub use client::{IqAirClient, IqAirConfig, DEFAULT_BASE_URL};
pub use error::UpstreamError;
pub use pollution::{format_reading, LiveReading, LiveResult, PollutionSummary, RawPollution};
pub use source::PollutionSource;

#[cfg(any(test, feature = "testing"))]
pub use source::MockPollutionSource;
