//! Provider Payloads and Live Reading Envelope

use crate::error::UpstreamError;
use crate::source::PollutionSource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// The `data` section of a nearest-city response.
///
/// Whatever the provider sent is kept as-is; accessors return `None` when
/// the expected shape is missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawPollution {
    data: Value,
}

impl RawPollution {
    /// Wrap an already unwrapped `data` section
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Unwrap `body.data` from a full response body
    pub fn from_body(body: Value) -> Self {
        let data = match body {
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Self { data }
    }

    /// The raw `data` section
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// `data.current.pollution`, if present
    pub fn pollution(&self) -> Option<&Map<String, Value>> {
        self.data.get("current")?.get("pollution")?.as_object()
    }

    /// US AQI of the current reading, rounded if sent as a fraction
    pub fn aqius(&self) -> Option<i64> {
        let aqius = self.pollution()?.get("aqius")?;
        aqius
            .as_i64()
            .or_else(|| aqius.as_f64().and_then(round_index))
            .or_else(|| {
                let s = aqius.as_str()?.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(round_index))
            })
    }

    /// Provider timestamp of the current reading
    pub fn timestamp(&self) -> Option<&str> {
        self.pollution()?.get("ts")?.as_str()
    }
}

fn round_index(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.round() as i64)
}

/// Pollution fields exposed by the live endpoint, passed through verbatim
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollutionSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aqius: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mainus: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aqicn: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maincn: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveResult {
    #[serde(rename = "Pollution")]
    pub pollution: PollutionSummary,
}

/// `{"Result":{"Pollution":{...}}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    #[serde(rename = "Result")]
    pub result: LiveResult,
}

impl LiveReading {
    /// Reshape a provider payload into the live reading envelope
    pub fn from_raw(raw: &RawPollution) -> Result<Self, UpstreamError> {
        let pollution = raw
            .pollution()
            .ok_or(UpstreamError::MalformedPayload("data.current.pollution"))?;
        let field = |name: &str| pollution.get(name).cloned();

        Ok(Self {
            result: LiveResult {
                pollution: PollutionSummary {
                    ts: field("ts"),
                    aqius: field("aqius"),
                    mainus: field("mainus"),
                    aqicn: field("aqicn"),
                    maincn: field("maincn"),
                },
            },
        })
    }
}

/// Fetch a live reading for the given coordinates and reshape it
pub async fn format_reading(
    source: &dyn PollutionSource,
    latitude: f64,
    longitude: f64,
) -> Result<LiveReading, UpstreamError> {
    let raw = source.fetch(latitude, longitude).await?;
    debug!(latitude, longitude, "Formatting live reading");
    LiveReading::from_raw(&raw)
}
