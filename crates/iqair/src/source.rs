//! Pollution Source Abstraction

use crate::error::UpstreamError;
use crate::pollution::RawPollution;
use async_trait::async_trait;

/// Anything that can produce a nearest-city reading for a coordinate pair
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PollutionSource: Send + Sync {
    /// Fetch the provider's `data` section for the given coordinates.
    ///
    /// Coordinates are expected to be range-checked by the caller.
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<RawPollution, UpstreamError>;
}
