//! Controller phases and wall-clock alignment.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use corelib::MinuteKey;
use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;

/// Phase of a cadence controller.
///
/// ```text
/// Idle ──► Fetching ──► Idle
///            │  ▲
///            ▼  │
///          Backoff
/// Idle ──► Aggregating
/// any  ──► ShuttingDown (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CadencePhase {
    #[default]
    Idle,
    Fetching,
    Backoff,
    Aggregating,
    ShuttingDown,
}

impl CadencePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CadencePhase::Idle => "idle",
            CadencePhase::Fetching => "fetching",
            CadencePhase::Backoff => "backoff",
            CadencePhase::Aggregating => "aggregating",
            CadencePhase::ShuttingDown => "shutting_down",
        }
    }

    /// Staying in the same phase is always allowed, except once shut down.
    pub fn can_transition_to(self, next: CadencePhase) -> bool {
        use CadencePhase::*;

        match (self, next) {
            (ShuttingDown, _) => false,
            (_, ShuttingDown) => true,
            (a, b) if a == b => true,
            (Idle, Fetching) | (Idle, Aggregating) => true,
            (Fetching, Idle) | (Fetching, Backoff) => true,
            (Backoff, Fetching) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CadencePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit state machine around [`CadencePhase`].
#[derive(Debug, Default)]
pub struct Cadence {
    phase: CadencePhase,
}

impl Cadence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CadencePhase {
        self.phase
    }

    pub fn is_shutting_down(&self) -> bool {
        self.phase == CadencePhase::ShuttingDown
    }

    /// Moves to `next`, returning the phase that was left.
    pub fn advance(&mut self, next: CadencePhase) -> Result<CadencePhase, EngineError> {
        let from = self.phase;
        if !from.can_transition_to(next) {
            return Err(EngineError::IllegalTransition { from, to: next });
        }

        if from != next {
            debug!(%from, to = %next, "cadence transition");
        }
        self.phase = next;
        Ok(from)
    }
}

/// Time left until the next wall-clock minute boundary.
///
/// Exactly on a boundary this is a full minute, never zero.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let next = MinuteKey::floor(now).next().instant();
    (next - now).to_std().unwrap_or_default()
}
