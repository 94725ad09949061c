//! Reason codes for step state changes

use serde::{Deserialize, Serialize};

/// Why a step event was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // T001: Entering CURRENT
    // =========================================================================
    /// Qualifying sample arrived while no step was current
    T001_ENTERED_CURRENT,
    /// Qualifying evidence for this step pre-empted another current step
    T001_TOOK_OVER_CURRENT,

    // =========================================================================
    // T002: Leaving CURRENT
    // =========================================================================
    /// Another step became current; this one reverts to IDLE
    T002_PREEMPTED,

    // =========================================================================
    // T003: Confirmation
    // =========================================================================
    /// Accumulated qualifying duration reached the threshold
    T003_CONFIRMED,

    // =========================================================================
    // T004: Session
    // =========================================================================
    /// Explicit session reset
    T004_SESSION_RESET,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::T001_ENTERED_CURRENT => "T001_ENTERED_CURRENT",
            Self::T001_TOOK_OVER_CURRENT => "T001_TOOK_OVER_CURRENT",
            Self::T002_PREEMPTED => "T002_PREEMPTED",
            Self::T003_CONFIRMED => "T003_CONFIRMED",
            Self::T004_SESSION_RESET => "T004_SESSION_RESET",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::T001_ENTERED_CURRENT => "Step started",
            Self::T001_TOOK_OVER_CURRENT => "Step started, previous step interrupted",
            Self::T002_PREEMPTED => "Interrupted by another step",
            Self::T003_CONFIRMED => "Sustained long enough - step confirmed",
            Self::T004_SESSION_RESET => "Session reset",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
