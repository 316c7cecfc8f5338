//! IQAir HTTP Client
//!
//! Issues `GET {base_url}/nearest_city` requests and unwraps the response
//! envelope. Timeouts are left to the transport defaults.

use crate::error::UpstreamError;
use crate::pollution::RawPollution;
use crate::source::PollutionSource;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Default provider base URL
pub const DEFAULT_BASE_URL: &str = "http://api.airvisual.com/v2";

/// Provider connection settings
#[derive(Debug, Clone)]
pub struct IqAirConfig {
    /// Base URL, without the endpoint path
    pub base_url: String,
    /// API key appended to every request
    pub api_key: String,
}

impl Default for IqAirConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
        }
    }
}

/// Client for the IQAir nearest-city endpoint
#[derive(Debug, Clone)]
pub struct IqAirClient {
    http: reqwest::Client,
    config: IqAirConfig,
}

impl IqAirClient {
    /// Create a new client with its own connection pool
    pub fn new(config: IqAirConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("air-quality/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, config))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(http: reqwest::Client, config: IqAirConfig) -> Self {
        if config.api_key.is_empty() {
            warn!("IQAir API key is empty; provider requests will be rejected");
        }
        Self { http, config }
    }

    fn nearest_city_url(&self) -> String {
        format!("{}/nearest_city", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PollutionSource for IqAirClient {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<RawPollution, UpstreamError> {
        debug!(latitude, longitude, "Requesting nearest city reading");

        let result: Result<RawPollution, UpstreamError> = async {
            let response = self
                .http
                .get(self.nearest_city_url())
                .query(&[
                    ("lat", latitude.to_string()),
                    ("lon", longitude.to_string()),
                    ("key", self.config.api_key.clone()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Could not read error body".to_string());
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response.json::<Value>().await?;
            Ok(RawPollution::from_body(body))
        }
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("airquality_upstream_requests_total", "outcome" => outcome).increment(1);

        if let Err(e) = &result {
            warn!(latitude, longitude, "Nearest city request failed: {}", e);
        }
        result
    }
}
