//! Air Quality API Server
//!
//! Serves live readings for arbitrary coordinates and the most polluted
//! moment recorded for the fixed location, while a background recorder
//! samples that location on a timer.

use anyhow::Context;
use axum::{
    handler::Handler,
    routing::{get, MethodRouter},
    Router,
};
use iqair::{IqAirClient, PollutionSource};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use recorder::Recorder;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{MemoryRepository, ReadingStore, SqliteRepository};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;

pub use config::{DbDriver, Settings};
pub use error::ApiError;

use data_validator::Validator;

/// Application state shared across handlers
pub struct AppState {
    /// Provider used for live reads
    pub source: Arc<dyn PollutionSource>,
    /// Where the recorder writes and the peak query reads
    pub store: Arc<dyn ReadingStore>,
    pub validator: Validator,
    /// Location label the peak query reports on
    pub location: String,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        source: Arc<dyn PollutionSource>,
        store: Arc<dyn ReadingStore>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            validator: Validator::default(),
            location: location.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router.
///
/// API routes live under `prefix`; `/health` and `/metrics` stay at the root.
pub fn create_router(state: Arc<AppState>, prefix: &str) -> Router {
    let api = Router::new()
        .route("/", only_get(routes::system::root))
        .route("/air-quality", only_get(routes::air_quality::get_air_quality))
        .route(
            "/air-quality/datetime/most-polluted",
            only_get(routes::air_quality::get_most_polluted),
        );

    let prefix = prefix.trim_matches('/');
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&format!("/{}", prefix), api)
    };

    router
        .route("/health", only_get(routes::system::health))
        .route("/metrics", only_get(routes::system::metrics))
        .fallback(routes::system::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET route whose other methods fall through to the 404 error body
fn only_get<H, T>(handler: H) -> MethodRouter<Arc<AppState>>
where
    H: Handler<T, Arc<AppState>>,
    T: 'static,
{
    get(handler).fallback(routes::system::not_found)
}

/// Initialize logging. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn ReadingStore>> {
    match settings.db_driver {
        DbDriver::Sqlite => {
            let url = settings.database_url();
            let repo = SqliteRepository::connect(&url, settings.db_max_connections)
                .await
                .with_context(|| format!("Failed to open database {}", url))?;
            Ok(Arc::new(repo))
        }
        DbDriver::Memory => {
            warn!("Using in-memory store; readings are lost on restart");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the server until Ctrl-C
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics exporter unavailable: {}", e);
            None
        }
    };

    let source: Arc<dyn PollutionSource> = Arc::new(
        IqAirClient::new(settings.iqair()).context("Failed to build IQAir client")?,
    );
    let store = open_store(&settings).await?;

    let recorder_config = settings.recorder();
    let location = recorder_config.location.label.clone();
    let recorder = Arc::new(Recorder::new(
        Arc::clone(&source),
        Arc::clone(&store),
        recorder_config,
    ));
    let recorder_handle = recorder.spawn();

    let mut state = AppState::new(source, store, location);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let governor = rate_limit::create_governor_config(&settings.rate_limit())
        .context("Rate limit period and burst size must be non-zero")?;
    let app = rate_limit::apply_rate_limit(
        create_router(Arc::new(state), &settings.api_prefix),
        governor,
    );

    let addr = settings.listen_addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    recorder_handle.stop().await;
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use iqair::{MockPollutionSource, RawPollution, UpstreamError};
    use serde_json::{json, Value};
    use storage::{MockReadingStore, NewReading, StorageError, NO_READING_MESSAGE};
    use tower::ServiceExt;

    fn app(source: MockPollutionSource, store: Arc<dyn ReadingStore>) -> Router {
        let state = AppState::new(Arc::new(source), store, "Paris");
        create_router(Arc::new(state), "v1")
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        send_json(app, Method::GET, uri).await
    }

    async fn send_json(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn provider_data() -> RawPollution {
        RawPollution::new(json!({
            "city": "Somewhere",
            "current": {
                "pollution": {
                    "ts": "2023-04-01T10:00:00.000Z",
                    "aqius": 57,
                    "mainus": "p2",
                    "aqicn": 20,
                    "maincn": "p2"
                },
                "weather": {"tp": 12}
            }
        }))
    }

    #[tokio::test]
    async fn test_invalid_coordinates_skip_fetch() {
        let mut source = MockPollutionSource::new();
        source.expect_fetch().never();

        let (status, body) = get_json(
            app(source, Arc::new(MemoryRepository::new())),
            "/v1/air-quality?latitude=100&longitude=abc",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({
                "message": "\"latitude\" must be less than or equal to 90, \"longitude\" must be a number",
                "data": null
            })
        );
    }

    #[tokio::test]
    async fn test_missing_coordinates() {
        let mut source = MockPollutionSource::new();
        source.expect_fetch().never();

        let (status, body) = get_json(
            app(source, Arc::new(MemoryRepository::new())),
            "/v1/air-quality",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["message"],
            "\"latitude\" is required, \"longitude\" is required"
        );
    }

    #[tokio::test]
    async fn test_live_reading_envelope() {
        let mut source = MockPollutionSource::new();
        source
            .expect_fetch()
            .withf(|lat, lon| *lat == 10.0 && *lon == 20.0)
            .times(1)
            .returning(|_, _| Ok(provider_data()));

        let (status, body) = get_json(
            app(source, Arc::new(MemoryRepository::new())),
            "/v1/air-quality?latitude=10&longitude=20",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"Result": {"Pollution": {
                "ts": "2023-04-01T10:00:00.000Z",
                "aqius": 57,
                "mainus": "p2",
                "aqicn": 20,
                "maincn": "p2"
            }}})
        );
    }

    #[tokio::test]
    async fn test_boundary_coordinates_accepted() {
        let mut source = MockPollutionSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(provider_data()));

        let (status, _) = get_json(
            app(source, Arc::new(MemoryRepository::new())),
            "/v1/air-quality?latitude=-90&longitude=180",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_generic_500() {
        let mut source = MockPollutionSource::new();
        source.expect_fetch().returning(|_, _| {
            Err(UpstreamError::Status {
                status: 403,
                body: "incorrect_api_key".to_string(),
            })
        });

        let (status, body) = get_json(
            app(source, Arc::new(MemoryRepository::new())),
            "/v1/air-quality?latitude=10&longitude=20",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"message": error::INTERNAL_ERROR_MESSAGE, "data": null})
        );
    }

    #[tokio::test]
    async fn test_repeated_coordinate_is_not_a_number() {
        let mut source = MockPollutionSource::new();
        source.expect_fetch().never();

        let (status, body) = get_json(
            app(source, Arc::new(MemoryRepository::new())),
            "/v1/air-quality?latitude=1&latitude=2&longitude=3",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"message": "\"latitude\" must be a number", "data": null})
        );
    }

    #[tokio::test]
    async fn test_most_polluted_store_failure_is_generic_500() {
        let mut store = MockReadingStore::new();
        store
            .expect_highest_aqius()
            .times(1)
            .returning(|_| Err(StorageError::DatabaseError("database is locked".to_string())));

        let (status, body) = get_json(
            app(MockPollutionSource::new(), Arc::new(store)),
            "/v1/air-quality/datetime/most-polluted",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"message": error::INTERNAL_ERROR_MESSAGE, "data": null})
        );
    }

    #[tokio::test]
    async fn test_most_polluted_empty_store() {
        let (status, body) = get_json(
            app(MockPollutionSource::new(), Arc::new(MemoryRepository::new())),
            "/v1/air-quality/datetime/most-polluted",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": NO_READING_MESSAGE, "data": null}));
    }

    #[tokio::test]
    async fn test_most_polluted_returns_peak() {
        let store = Arc::new(MemoryRepository::new());
        let low = Utc.with_ymd_and_hms(2023, 4, 1, 8, 0, 0).unwrap();
        let high = Utc.with_ymd_and_hms(2023, 4, 1, 9, 0, 0).unwrap();
        store.insert(NewReading::new("Paris", 30, low)).await.unwrap();
        let peak = store.insert(NewReading::new("Paris", 80, high)).await.unwrap();

        let (status, body) = get_json(
            app(MockPollutionSource::new(), store),
            "/v1/air-quality/datetime/most-polluted",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["iqAirDateTime"], "2023-04-01T09:00:00.000Z");
        assert_eq!(
            body,
            serde_json::to_value(storage::PollutionPeak::from(&peak)).unwrap()
        );
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let router = app(MockPollutionSource::new(), Arc::new(MemoryRepository::new()));

        let (status, body) = get_json(router.clone(), "/v1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "success", "message": "Welcome to the Air Quality Api Service"})
        );

        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "message": "healthy"}));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = get_json(
            app(MockPollutionSource::new(), Arc::new(MemoryRepository::new())),
            "/v1/nowhere",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "Cannot GET /v1/nowhere", "data": null}));
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_found() {
        let mut source = MockPollutionSource::new();
        source.expect_fetch().never();
        let router = app(source, Arc::new(MemoryRepository::new()));

        let (status, body) = send_json(router.clone(), Method::POST, "/v1/air-quality").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"message": "Cannot POST /v1/air-quality", "data": null})
        );

        let (status, body) = send_json(router, Method::DELETE, "/health").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot DELETE /health");
    }
}
