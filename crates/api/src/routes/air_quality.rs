//! Air Quality Routes

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use iqair::LiveReading;
use std::sync::Arc;
use storage::PollutionPeak;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Raw coordinates as sent by the client, validated by hand
#[derive(Debug, Default, PartialEq)]
pub struct CoordinatesQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl CoordinatesQuery {
    /// Collect the coordinate parameters from raw query pairs.
    ///
    /// A repeated key keeps all of its values joined by `,`, which never
    /// parses as a number.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "latitude" => &mut query.latitude,
                "longitude" => &mut query.longitude,
                _ => continue,
            };
            *slot = Some(match slot.take() {
                Some(existing) => format!("{},{}", existing, value),
                None => value,
            });
        }
        query
    }
}

/// Live reading for the nearest city to the given coordinates
pub async fn get_air_quality(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<LiveReading>, ApiError> {
    let Query(pairs) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let params = CoordinatesQuery::from_pairs(pairs);
    let coordinates = state
        .validator
        .validate_coordinates(params.latitude.as_deref(), params.longitude.as_deref())?;

    debug!(
        latitude = coordinates.latitude,
        longitude = coordinates.longitude,
        "Live air quality requested"
    );
    let reading = iqair::format_reading(
        state.source.as_ref(),
        coordinates.latitude,
        coordinates.longitude,
    )
    .await?;
    Ok(Json(reading))
}

/// When the recorded location was most polluted
pub async fn get_most_polluted(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PollutionPeak>, ApiError> {
    let peak = storage::most_polluted(state.store.as_ref(), &state.location).await?;
    Ok(Json(peak))
}
