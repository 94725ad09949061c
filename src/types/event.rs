//! Outbound step events

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{ReasonCode, StepId, StepState};

/// One externally visible change of a step's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Step that changed
    pub step: StepId,
    /// State it changed to
    pub state: StepState,
    /// Why it changed
    pub reason: ReasonCode,
    /// Sample timestamp that caused the change (milliseconds)
    pub at_ms: u64,
    /// Wall-clock time the event was produced
    pub emitted_at: DateTime<Utc>,
}

impl StepEvent {
    /// Create new event
    pub fn new(step: StepId, state: StepState, reason: ReasonCode, at_ms: u64) -> Self {
        Self {
            step,
            state,
            reason,
            at_ms,
            emitted_at: Utc::now(),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        format!(
            "{}{} {} → {} | t={:.2}s | {}{}",
            self.state.color_code(),
            self.state.emoji(),
            self.step,
            self.state,
            self.at_ms as f64 / 1000.0,
            self.reason.code(),
            StepState::color_reset()
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "step={} | state={} | t={} | reason={}",
            self.step.number(),
            self.state,
            self.at_ms,
            self.reason.code()
        )
    }
}
