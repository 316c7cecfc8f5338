//! Service Routes

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "success",
        message: "Welcome to the Air Quality Api Service",
    })
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "success",
        message: "healthy",
    })
}

/// Prometheus text exposition, if a recorder was installed
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}

pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
