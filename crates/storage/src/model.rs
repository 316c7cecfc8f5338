//! Reading Records

use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reading about to be written.
///
/// `aqius` and `iq_air_date_time` are optional so that incomplete candidates
/// can be expressed and rejected before anything reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub location: String,
    pub aqius: Option<i64>,
    pub iq_air_date_time: Option<DateTime<Utc>>,
}

impl NewReading {
    /// Create a complete reading
    pub fn new(location: impl Into<String>, aqius: i64, iq_air_date_time: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            aqius: Some(aqius),
            iq_air_date_time: Some(iq_air_date_time),
        }
    }

    /// Check required fields, returning `(aqius, iq_air_date_time)`
    pub fn validate(&self) -> Result<(i64, DateTime<Utc>), StorageError> {
        if self.location.trim().is_empty() {
            return Err(StorageError::MissingField("location"));
        }
        let aqius = self.aqius.ok_or(StorageError::MissingField("aqius"))?;
        let iq_air_date_time = self
            .iq_air_date_time
            .ok_or(StorageError::MissingField("iqAirDateTime"))?;
        Ok((aqius, iq_air_date_time))
    }
}

/// A persisted reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReading {
    pub id: i64,
    pub location: String,
    pub aqius: i64,
    #[serde(with = "js_date")]
    pub iq_air_date_time: DateTime<Utc>,
    #[serde(with = "js_date")]
    pub created_at: DateTime<Utc>,
}

/// Timestamps of the most polluted reading for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutionPeak {
    #[serde(with = "js_date")]
    pub iq_air_date_time: DateTime<Utc>,
    #[serde(with = "js_date")]
    pub air_quality_saved_at: DateTime<Utc>,
}

impl From<&StoredReading> for PollutionPeak {
    fn from(reading: &StoredReading) -> Self {
        Self {
            iq_air_date_time: reading.iq_air_date_time,
            air_quality_saved_at: reading.created_at,
        }
    }
}

/// Millisecond-precision UTC timestamps, e.g. `2023-04-01T00:00:00.000Z`
mod js_date {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
