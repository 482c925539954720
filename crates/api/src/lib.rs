//! Pose Target Game Server
//!
//! Runs the game runtime and serves its state and commands over HTTP/JSON.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod config;
pub mod error;
pub mod metrics;
mod routes;
pub mod runtime;
pub mod snapshot;

pub use config::{AppConfig, LogFormat, LoggingConfig};
pub use error::ApiError;
pub use runtime::{GameCore, GameRuntime, RuntimeError, RuntimeHandle, RuntimeTasks};
pub use snapshot::{ErrorReport, GameSnapshot};

use target_game::Lifecycle;

/// Application state shared across handlers
pub struct AppState {
    /// Command and snapshot access to the game runtime
    pub runtime: RuntimeHandle,
    /// Prometheus render handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(runtime: RuntimeHandle, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            runtime,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub tracking_active: bool,
    pub lifecycle: Lifecycle,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/state", get(routes::state::get_state))
        .route("/api/v1/session/start", post(routes::session::start))
        .route("/api/v1/session/stop", post(routes::session::stop))
        .route("/api/v1/session/restart", post(routes::session::restart))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let snapshot = state.runtime.snapshot();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        tracking_active: snapshot.tracking_active,
        lifecycle: snapshot.session.lifecycle,
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ApiError::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init(),
    };
    result.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Serve `state` on the configured address until the listener fails
pub async fn run_server(config: &AppConfig, state: Arc<AppState>) -> Result<(), ApiError> {
    let app = create_router(state);

    info!("Starting API server on {}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use camera_capture::{SyntheticCamera, SyntheticScene};
    use pose_landmarks::MockLandmarkProvider;
    use tower::ServiceExt;

    fn app(camera: SyntheticCamera) -> (Router, RuntimeTasks) {
        let mut config = AppConfig::default();
        config.runtime.seed = Some(3);
        let core = GameCore::new(&config, Box::new(camera)).unwrap();
        let (handle, tasks) =
            GameRuntime::spawn(core, Arc::new(MockLandmarkProvider::synthetic()), &config);
        (create_router(Arc::new(AppState::new(handle, None))), tasks)
    }

    fn synthetic() -> SyntheticCamera {
        SyntheticCamera::new(Default::default(), SyntheticScene::default())
    }

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test(start_paused = true)]
    async fn test_health() {
        let (app, tasks) = app(synthetic());
        let (status, body) = call(&app, "GET", "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["lifecycle"], "idle");
        tasks.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_commands() {
        let (app, tasks) = app(synthetic());

        let (status, body) = call(&app, "POST", "/api/v1/session/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["lifecycle"], "running");
        assert_eq!(body["tracking_active"], true);

        // Already running
        let (status, _) = call(&app, "POST", "/api/v1/session/start").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, "POST", "/api/v1/session/restart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["score"], 0);

        let (status, body) = call(&app, "POST", "/api/v1/session/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["lifecycle"], "idle");

        let (_, state) = call(&app, "GET", "/api/v1/state").await;
        assert_eq!(state["tracking_active"], false);
        tasks.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_while_idle_conflicts() {
        let (app, tasks) = app(synthetic());
        let (status, body) = call(&app, "POST", "/api/v1/session/restart").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("Tracking is not active"));
        tasks.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_camera_reports_category() {
        let (app, tasks) = app(SyntheticCamera::denied(Default::default()));
        let (status, body) = call(&app, "POST", "/api/v1/session/start").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["category"], "permission_denied");

        let (_, state) = call(&app, "GET", "/api/v1/state").await;
        assert_eq!(state["last_error"]["category"], "permission_denied");
        tasks.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_without_recorder() {
        let (app, tasks) = app(synthetic());
        let (status, _) = call(&app, "GET", "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        tasks.shutdown();
    }
}
