//! Error translation at the HTTP boundary
//!
//! Every handler error ends up here and is rendered as `{message, data: null}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::Violations;
use iqair::UpstreamError;
use serde::Serialize;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

/// Message for any failure the client is not told the details of
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occured while attempting to process your request";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Query parameters violated one or more constraints
    #[error("{0}")]
    Validation(#[from] Violations),

    /// Query string could not be decoded at all
    #[error("{0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cannot {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// Client exceeded its request quota
    #[error("Too many requests, please try again later")]
    TooManyRequests,
}

/// Uniform error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client sees; internal causes are never exposed
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            Self::Storage(StorageError::NotFound(message)) => message.clone(),
            Self::Storage(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Internal error: {}", self);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", self);
        }

        let body = ErrorBody {
            message: self.public_message(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
