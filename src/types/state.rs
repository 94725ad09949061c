//! Step state definitions

use serde::{Deserialize, Serialize};

/// The three states a step moves through during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepState {
    /// Not being performed, light off
    #[default]
    Idle,
    /// Being performed now, light blinking
    Current,
    /// Confirmed for this session, light solid
    Completed,
}

impl StepState {
    /// Parse the exact wire literal ("IDLE" | "CURRENT" | "COMPLETED")
    pub fn from_literal(literal: &str) -> Option<StepState> {
        match literal {
            "IDLE" => Some(StepState::Idle),
            "CURRENT" => Some(StepState::Current),
            "COMPLETED" => Some(StepState::Completed),
            _ => None,
        }
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            StepState::Idle => "\x1b[90m",      // Gray
            StepState::Current => "\x1b[33m",   // Yellow
            StepState::Completed => "\x1b[32m", // Green
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            StepState::Idle => "⚪",
            StepState::Current => "🟡",
            StepState::Completed => "🟢",
        }
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepState::Idle => "IDLE",
            StepState::Current => "CURRENT",
            StepState::Completed => "COMPLETED",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_match_wire() {
        for state in [StepState::Idle, StepState::Current, StepState::Completed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
            assert_eq!(StepState::from_literal(&state.to_string()), Some(state));
        }
        assert_eq!(StepState::from_literal("current"), None);
        assert_eq!(StepState::from_literal("DONE"), None);
    }
}
