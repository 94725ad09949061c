//! Read-only per-step progress snapshot

use serde::{Deserialize, Serialize};
use crate::types::{Orientation, StepId, StepState};

/// Interpreter's view of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatus {
    pub step: StepId,
    pub state: StepState,
    /// Step holds the session's current pointer
    pub is_current: bool,
    /// Qualifying duration credited so far (milliseconds)
    pub credited_ms: u64,
    /// Duration needed to confirm (milliseconds)
    pub required_ms: u64,
    /// Dropouts seen while accumulating
    pub dropouts: u32,
    /// Sample timestamp at confirmation
    pub completed_at_ms: Option<u64>,
    /// Orientation lanes that already reached the threshold
    pub satisfied: Vec<Orientation>,
}
