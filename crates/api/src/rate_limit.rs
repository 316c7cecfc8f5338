//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-client-IP rate limiting using tower_governor. Applied to the served
//! application only; requires `into_make_service_with_connect_info::<SocketAddr>()`
//! so the peer address is available. Rejections use the common error body.

use crate::error::ApiError;
use axum::{
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;

/// Governor config keyed by peer IP, with X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 30,
        }
    }
}

/// Build the governor config; `None` if either value is zero
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

/// Wrap `router` in the governor, rendering its rejections as `ApiError`
pub fn apply_rate_limit(router: Router, config: Arc<DefaultGovernorConfig>) -> Router {
    router
        .layer(GovernorLayer { config })
        .layer(middleware::map_response(render_rejection))
}

/// Replace the governor's plain-text 429 body, keeping its rate limit headers
async fn render_rejection(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let mut rendered = ApiError::TooManyRequests.into_response();
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}
