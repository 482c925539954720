//! Game metrics

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use pose_landmarks::KeypointId;

/// Metric names as constants for consistency.
pub mod names {
    pub const ROUNDS_STARTED_TOTAL: &str = "pose_game_rounds_started_total";
    pub const HITS_TOTAL: &str = "pose_game_hits_total";
    pub const WINS_TOTAL: &str = "pose_game_wins_total";
    pub const LOSSES_TOTAL: &str = "pose_game_losses_total";
    pub const SCORE: &str = "pose_game_score";
    pub const WIN_DURATION_SECONDS: &str = "pose_game_win_duration_seconds";
}

pub fn record_round_started() {
    counter!(names::ROUNDS_STARTED_TOTAL).increment(1);
    gauge!(names::SCORE).set(0.0);
}

pub fn record_hit(by: KeypointId, score: u32) {
    let labels = [("keypoint", by.name().to_string())];
    counter!(names::HITS_TOTAL, &labels).increment(1);
    gauge!(names::SCORE).set(f64::from(score));
}

pub fn record_win(elapsed: Duration) {
    counter!(names::WINS_TOTAL).increment(1);
    histogram!(names::WIN_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_loss(score: u32) {
    let labels = [("score", score.to_string())];
    counter!(names::LOSSES_TOTAL, &labels).increment(1);
}
