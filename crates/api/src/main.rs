//! Pose Target Game - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api::{init_logging, metrics::init_metrics, run_server, AppConfig, AppState, GameCore, GameRuntime};
use camera_capture::{SyntheticCamera, SyntheticScene};
use pose_landmarks::MockLandmarkProvider;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // First argument wins over POSE_GAME_CONFIG
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("POSE_GAME_CONFIG").ok())
        .map(PathBuf::from);

    let config = AppConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(&config.logging).context("initializing logging")?;

    info!("=== Pose Target Game v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let camera = SyntheticCamera::new(config.camera.clone(), SyntheticScene::default());
    let provider = MockLandmarkProvider::synthetic()
        .with_latency(Duration::from_millis(config.runtime.mock_latency_ms));
    let core = GameCore::new(&config, Box::new(camera)).context("building game core")?;
    let (runtime, tasks) = GameRuntime::spawn(core, Arc::new(provider), &config);

    let state = Arc::new(AppState::new(runtime, metrics));
    let result = run_server(&config, state).await;
    tasks.shutdown();
    result.context("serving API")?;

    Ok(())
}
