//! Application configuration
//!
//! Defaults, then an optional TOML file, then `POSE_GAME__*` environment
//! variables (`POSE_GAME__GAME__MAX_SCORE=5`).

use std::path::Path;
use std::time::Duration;

use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use face_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use target_game::GameConfig;

use crate::error::ApiError;

pub const ENV_PREFIX: &str = "POSE_GAME";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging settings; `RUST_LOG` overrides `level` when set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Detection loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Detection tick period in milliseconds
    pub detection_interval_ms: u64,
    /// Run pose inference on every n-th detection tick
    pub inference_every: u64,
    /// Capacity of the command queue
    pub command_buffer: usize,
    /// Target placement seed; random when unset
    pub seed: Option<u64>,
    /// Simulated inference latency of the built-in mock provider
    pub mock_latency_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 16,
            inference_every: 2,
            command_buffer: 16,
            seed: None,
            mock_latency_ms: 20,
        }
    }
}

impl RuntimeConfig {
    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub runtime: RuntimeConfig,
    pub camera: CameraConfig,
    pub tracker: TrackerConfig,
    pub game: GameConfig,
}

impl AppConfig {
    /// Load from defaults, the optional file at `path` and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ApiError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        self.tracker.validate()?;
        self.game.validate()?;
        if self.runtime.detection_interval_ms == 0 || self.runtime.inference_every == 0 {
            return Err(ApiError::InvalidConfig(
                "runtime.detection_interval_ms and runtime.inference_every must be positive".into(),
            ));
        }
        if self.runtime.command_buffer == 0 {
            return Err(ApiError::InvalidConfig("runtime.command_buffer must be positive".into()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ApiError::InvalidConfig("camera size must be non-zero".into()));
        }
        Ok(())
    }
}
