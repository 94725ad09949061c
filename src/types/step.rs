//! Step identifiers and hand orientation

use serde::{Deserialize, Serialize};
use crate::types::ProtocolError;
use crate::{FIRST_STEP, LAST_STEP, STEP_COUNT};

/// One of the six tracked hand-cleaning motions (2..=7).
///
/// Steps 0 and 1 are never mapped; any value outside 2..=7 is rejected at the
/// boundary, so a `StepId` in hand always indexes a valid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct StepId(u8);

impl StepId {
    /// All tracked steps in ascending order
    pub const ALL: [StepId; STEP_COUNT] = [
        StepId(2),
        StepId(3),
        StepId(4),
        StepId(5),
        StepId(6),
        StepId(7),
    ];

    /// Wire number (2..=7)
    pub fn number(self) -> u8 {
        self.0
    }

    /// Slot in a fixed table of `STEP_COUNT` entries
    pub fn index(self) -> usize {
        (self.0 - FIRST_STEP) as usize
    }

    /// Inverse of [`StepId::index`]
    pub fn from_index(index: usize) -> Option<StepId> {
        StepId::ALL.get(index).copied()
    }
}

impl TryFrom<i64> for StepId {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (FIRST_STEP as i64..=LAST_STEP as i64).contains(&value) {
            Ok(StepId(value as u8))
        } else {
            Err(ProtocolError::StepOutOfRange(value))
        }
    }
}

impl From<StepId> for u8 {
    fn from(step: StepId) -> u8 {
        step.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "STEP_{}", self.0)
    }
}

/// Which hand variant a sample reports for its step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Orientation {
    /// Classifier did not distinguish hands
    #[default]
    Unspecified,
    /// Left hand leading
    Left,
    /// Right hand leading
    Right,
}

impl Orientation {
    /// Number of orientation lanes
    pub const LANES: usize = 3;

    /// Lane index in a per-orientation table
    pub fn lane(self) -> usize {
        match self {
            Orientation::Unspecified => 0,
            Orientation::Left => 1,
            Orientation::Right => 2,
        }
    }

    /// Parse a loose console token (case-insensitive)
    pub fn parse_token(token: &str) -> Option<Orientation> {
        match token.to_ascii_uppercase().as_str() {
            "L" | "LEFT" => Some(Orientation::Left),
            "R" | "RIGHT" => Some(Orientation::Right),
            "-" | "NONE" | "UNSPECIFIED" => Some(Orientation::Unspecified),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_range_is_two_to_seven() {
        for n in 2..=7 {
            let step = StepId::try_from(n).unwrap();
            assert_eq!(step.number() as i64, n);
        }
        for n in [-1, 0, 1, 8, 9, 255] {
            assert!(StepId::try_from(n).is_err(), "step {} should be rejected", n);
        }
    }

    #[test]
    fn test_index_roundtrip() {
        for step in StepId::ALL {
            assert_eq!(StepId::from_index(step.index()), Some(step));
        }
        assert_eq!(StepId::from_index(STEP_COUNT), None);
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&StepId::ALL[2]).unwrap();
        assert_eq!(json, "4");
        let back: StepId = serde_json::from_str("7").unwrap();
        assert_eq!(back.number(), 7);
        assert!(serde_json::from_str::<StepId>("1").is_err());
    }
}
