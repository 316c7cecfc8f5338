//! Upstream Error Types

use thiserror::Error;

/// Errors that can occur while talking to the air quality provider
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// Connection, DNS or protocol failure
    #[error("Request to air quality provider failed: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("Air quality provider responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body could not be decoded as JSON
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Body decoded but lacks a section we need
    #[error("Provider response is missing {0}")]
    MalformedPayload(&'static str),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}
