//! Prometheus metrics for the runtime and server.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pose_landmarks::ErrorCategory;

use crate::error::ApiError;

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, ApiError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Metrics(e.to_string()))
}

/// Metric names as constants for consistency.
pub mod names {
    pub const INFERENCES_TOTAL: &str = "pose_game_inferences_total";
    pub const INFERENCE_FAILURES_TOTAL: &str = "pose_game_inference_failures_total";
    pub const INFERENCE_DURATION_SECONDS: &str = "pose_game_inference_duration_seconds";
    pub const STALE_RESULTS_TOTAL: &str = "pose_game_stale_results_total";
    pub const COMMANDS_TOTAL: &str = "pose_game_commands_total";
    pub const TRACKING_ACTIVE: &str = "pose_game_tracking_active";
}

pub fn record_inference(duration: Duration) {
    counter!(names::INFERENCES_TOTAL).increment(1);
    histogram!(names::INFERENCE_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn record_inference_failure(category: ErrorCategory) {
    let category = match category {
        ErrorCategory::PermissionDenied => "permission_denied",
        ErrorCategory::Generic => "generic",
    };
    counter!(names::INFERENCE_FAILURES_TOTAL, "category" => category).increment(1);
}

pub fn record_stale_result() {
    counter!(names::STALE_RESULTS_TOTAL).increment(1);
}

pub fn record_command(command: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "rejected" };
    counter!(names::COMMANDS_TOTAL, "command" => command, "outcome" => outcome).increment(1);
}

pub fn set_tracking_active(active: bool) {
    gauge!(names::TRACKING_ACTIVE).set(if active { 1.0 } else { 0.0 });
}
