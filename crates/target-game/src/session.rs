//! Round lifecycle: start, timer, hits and terminal states

use std::time::{Duration, Instant};

use pose_landmarks::{KeypointId, Pose};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::metrics;
use crate::target::{Bounds, Target, TargetEngine};
use crate::SessionError;

/// Round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Idle,
    Running,
    Won,
    Lost,
}

impl Lifecycle {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Won | Lifecycle::Lost)
    }
}

/// Timer display urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerUrgency {
    Normal,
    Warning,
    Critical,
}

/// Result of checking one detection frame against the target
#[derive(Debug, Clone, PartialEq)]
pub enum HitOutcome {
    Miss,
    Hit { by: KeypointId, score: u32, next: Target },
    Won { by: KeypointId, elapsed: Duration },
}

/// Result of one timer tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No round is running
    Inactive,
    Running { remaining: Duration },
    Lost { score: u32 },
}

/// Serializable view of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub lifecycle: Lifecycle,
    pub score: u32,
    pub max_score: u32,
    pub remaining_secs: f64,
    pub urgency: TimerUrgency,
    pub target: Target,
    /// Seconds taken to win, once won
    #[serde(skip_serializing_if = "Option::is_none")]
    pub won_after_secs: Option<f64>,
}

/// Game session state machine
pub struct GameSession<R: Rng = StdRng> {
    config: GameConfig,
    engine: TargetEngine<R>,
    lifecycle: Lifecycle,
    score: u32,
    remaining: Duration,
    started_at: Option<Instant>,
    won_after: Option<Duration>,
    respawns: u32,
}

impl GameSession<StdRng> {
    pub fn new(config: GameConfig, bounds: Bounds) -> Result<Self, SessionError> {
        config.validate()?;
        let engine = TargetEngine::new(config.target.clone(), bounds);
        Ok(Self::with_engine(config, engine))
    }

    pub fn seeded(config: GameConfig, bounds: Bounds, seed: u64) -> Result<Self, SessionError> {
        config.validate()?;
        let engine = TargetEngine::seeded(config.target.clone(), bounds, seed);
        Ok(Self::with_engine(config, engine))
    }
}

impl<R: Rng> GameSession<R> {
    pub fn with_engine(config: GameConfig, engine: TargetEngine<R>) -> Self {
        Self {
            remaining: config.time_limit(),
            config,
            engine,
            lifecycle: Lifecycle::Idle,
            score: 0,
            started_at: None,
            won_after: None,
            respawns: 0,
        }
    }

    /// Idle -> Running. Requires an active tracking pipeline.
    pub fn start(&mut self, tracking_active: bool, head_scale: f64, now: Instant) -> Result<(), SessionError> {
        if !tracking_active {
            return Err(SessionError::TrackingInactive);
        }
        if self.lifecycle != Lifecycle::Idle {
            return Err(SessionError::InvalidTransition {
                from: self.lifecycle,
                action: "start",
            });
        }
        self.begin_round(head_scale, now);
        Ok(())
    }

    /// Running/Won/Lost -> Running with a fresh round
    pub fn restart(&mut self, tracking_active: bool, head_scale: f64, now: Instant) -> Result<(), SessionError> {
        if !tracking_active || self.lifecycle == Lifecycle::Idle {
            return Err(SessionError::TrackingInactive);
        }
        self.begin_round(head_scale, now);
        Ok(())
    }

    fn begin_round(&mut self, head_scale: f64, now: Instant) {
        self.score = 0;
        self.remaining = self.config.time_limit();
        self.started_at = Some(now);
        self.won_after = None;
        self.respawns = 0;
        self.lifecycle = Lifecycle::Running;
        self.spawn_target(head_scale);
        metrics::record_round_started();
        info!(
            "Round started: {} hits in {:.1}s",
            self.config.max_score, self.config.time_limit_secs
        );
    }

    /// Any -> Idle; clears the round
    pub fn stop(&mut self) {
        if self.lifecycle != Lifecycle::Idle {
            info!("Session stopped from {:?} at score {}", self.lifecycle, self.score);
        }
        self.lifecycle = Lifecycle::Idle;
        self.engine.hide();
        self.score = 0;
        self.remaining = self.config.time_limit();
        self.started_at = None;
        self.won_after = None;
        self.respawns = 0;
    }

    /// Recompute remaining time; the round is lost when it reaches zero
    pub fn on_timer_tick(&mut self, now: Instant) -> TickOutcome {
        let (Lifecycle::Running, Some(started_at)) = (self.lifecycle, self.started_at) else {
            return TickOutcome::Inactive;
        };
        let elapsed = now.saturating_duration_since(started_at);
        self.remaining = self.config.time_limit().saturating_sub(elapsed);

        if self.remaining.is_zero() && self.score < self.config.max_score {
            self.lifecycle = Lifecycle::Lost;
            self.engine.hide();
            metrics::record_loss(self.score);
            info!("Time up: round lost at {}/{}", self.score, self.config.max_score);
            return TickOutcome::Lost { score: self.score };
        }
        TickOutcome::Running {
            remaining: self.remaining,
        }
    }

    /// Score a hit if a configured keypoint is inside the target
    pub fn on_detection(&mut self, pose: &Pose, head_scale: f64, now: Instant) -> HitOutcome {
        if self.lifecycle != Lifecycle::Running {
            return HitOutcome::Miss;
        }
        let Some(by) = self.engine.check_collision(pose) else {
            return HitOutcome::Miss;
        };

        self.score += 1;
        metrics::record_hit(by, self.score);
        debug!("Target hit by {} ({}/{})", by.name(), self.score, self.config.max_score);

        if self.score >= self.config.max_score {
            let elapsed = self
                .started_at
                .map(|t| now.saturating_duration_since(t))
                .unwrap_or_default();
            self.lifecycle = Lifecycle::Won;
            self.won_after = Some(elapsed);
            self.engine.hide();
            metrics::record_win(elapsed);
            info!("Round won in {:.1}s", elapsed.as_secs_f64());
            return HitOutcome::Won { by, elapsed };
        }

        self.spawn_target(head_scale);
        self.respawns += 1;
        HitOutcome::Hit {
            by,
            score: self.score,
            next: self.engine.target(),
        }
    }

    fn spawn_target(&mut self, head_scale: f64) {
        if self.score >= self.config.max_score {
            return;
        }
        self.engine.spawn(head_scale);
    }

    pub fn urgency(&self) -> TimerUrgency {
        let remaining = self.remaining.as_secs_f64();
        if remaining <= self.config.critical_secs {
            TimerUrgency::Critical
        } else if remaining <= self.config.warning_secs {
            TimerUrgency::Warning
        } else {
            TimerUrgency::Normal
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            lifecycle: self.lifecycle,
            score: self.score,
            max_score: self.config.max_score,
            remaining_secs: self.remaining.as_secs_f64(),
            urgency: self.urgency(),
            target: self.engine.target(),
            won_after_secs: self.won_after.map(|d| d.as_secs_f64()),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn target(&self) -> Target {
        self.engine.target()
    }

    pub fn won_after(&self) -> Option<Duration> {
        self.won_after
    }

    /// Targets placed after a hit in the current round
    pub fn respawns(&self) -> u32 {
        self.respawns
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}
