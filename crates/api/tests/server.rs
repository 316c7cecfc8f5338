//! End-to-end tests against a bound server

use api::rate_limit::{apply_rate_limit, create_governor_config, RateLimitConfig};
use api::{create_router, AppState};
use iqair::{MockPollutionSource, RawPollution};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use storage::MemoryRepository;

async fn serve(source: MockPollutionSource, rate_limit: Option<RateLimitConfig>) -> String {
    let state = AppState::new(
        Arc::new(source),
        Arc::new(MemoryRepository::new()),
        "Paris",
    );
    let mut app = create_router(Arc::new(state), "v1");
    if let Some(config) = rate_limit {
        let config = create_governor_config(&config).unwrap();
        app = apply_rate_limit(app, config);
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_live_reading_over_http() {
    let mut source = MockPollutionSource::new();
    source.expect_fetch().times(1).returning(|_, _| {
        Ok(RawPollution::new(json!({
            "current": {"pollution": {
                "ts": "2023-04-01T10:00:00.000Z",
                "aqius": 12,
                "mainus": "o3",
                "aqicn": 9,
                "maincn": "o3"
            }}
        })))
    });
    let base = serve(source, None).await;

    let response = reqwest::get(format!("{}/v1/air-quality?latitude=48.85&longitude=2.35", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["Result"]["Pollution"]["aqius"], 12);
    assert_eq!(body["Result"]["Pollution"]["mainus"], "o3");
}

#[tokio::test]
async fn test_validation_error_over_http() {
    let mut source = MockPollutionSource::new();
    source.expect_fetch().never();
    let base = serve(source, None).await;

    let response = reqwest::get(format!("{}/v1/air-quality?latitude=-91&longitude=181", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "\"latitude\" must be greater than or equal to -90, \"longitude\" must be less than or equal to 180"
    );
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_rate_limit_rejects_burst_overflow() {
    let base = serve(
        MockPollutionSource::new(),
        Some(RateLimitConfig {
            per_second: 60,
            burst_size: 2,
        }),
    )
    .await;

    let client = reqwest::Client::new();
    let mut statuses = Vec::new();
    for _ in 0..2 {
        let response = client.get(format!("{}/health", base)).send().await.unwrap();
        statuses.push(response.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200]);

    let rejected = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(rejected.status(), 429);
    assert!(rejected.headers().contains_key("x-ratelimit-after"));
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(
        body,
        json!({"message": "Too many requests, please try again later", "data": null})
    );
}
