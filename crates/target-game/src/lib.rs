//! Target Game
//!
//! Timed target-acquisition round driven by body landmarks:
//! - Target placement sized from the tracked head
//! - Wrist/ankle collision scoring
//! - Countdown timer with win/loss terminal states

pub mod config;
pub mod metrics;
pub mod session;
pub mod target;

pub use config::{GameConfig, TargetConfig};
pub use session::{GameSession, HitOutcome, Lifecycle, SessionSnapshot, TickOutcome, TimerUrgency};
pub use target::{Bounds, Target, TargetEngine};

use thiserror::Error;

/// Session error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Tracking is not active; start the camera first")]
    TrackingInactive,

    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        from: Lifecycle,
        action: &'static str,
    },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}
