//! Interpreter ↔ LED controller wire contract
//!
//! - `POST /signal` `{"step": 2..7, "state": "IDLE"|"CURRENT"|"COMPLETED"}` → `{"ok": true}`
//! - `POST /reset` → `{"ok": true}`
//! - `GET /health` → [`HealthReport`]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use crate::types::{StepId, StepState};

/// Input validation failures at the protocol boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("body is missing or not a JSON object")]
    MalformedBody,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("step must be an integer")]
    StepNotInteger,
    #[error("step {0} is outside 2..7")]
    StepOutOfRange(i64),
    #[error("unknown state literal: {0}")]
    UnknownState(String),
}

/// Body of `POST /signal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub step: StepId,
    pub state: StepState,
}

impl SignalRequest {
    /// Validate a raw request body.
    ///
    /// Unknown extra keys are accepted and ignored.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| ProtocolError::MalformedBody)?;
        let object = value.as_object().ok_or(ProtocolError::MalformedBody)?;

        let step = object.get("step").ok_or(ProtocolError::MissingField("step"))?;
        let state = object.get("state").ok_or(ProtocolError::MissingField("state"))?;

        let step = step.as_i64().ok_or(ProtocolError::StepNotInteger)?;
        let step = StepId::try_from(step)?;

        let state = match state.as_str() {
            Some(literal) => StepState::from_literal(literal)
                .ok_or_else(|| ProtocolError::UnknownState(literal.to_string()))?,
            None => return Err(ProtocolError::UnknownState(state.to_string())),
        };

        Ok(Self { step, state })
    }
}

/// Plain acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Rejection body for 4xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl From<&ProtocolError> for ErrorBody {
    fn from(err: &ProtocolError) -> Self {
        Self {
            ok: false,
            error: err.to_string(),
        }
    }
}

/// Controller's view of what is physically displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Controller reachable and serving
    pub ok: bool,
    /// Step currently blinking, if any
    pub current: Option<StepId>,
    /// Steps whose completed latch is set, ascending
    pub completed: Vec<StepId>,
    /// Steps whose light is on right now, ascending
    #[serde(default)]
    pub lit: Vec<StepId>,
    /// Milliseconds since the controller started
    #[serde(default)]
    pub uptime_ms: u64,
    #[serde(default)]
    pub version: String,
}
