//! Classifier samples

use serde::{Deserialize, Serialize};
use crate::types::{Orientation, StepId};

/// One per-frame reading from the classifier.
///
/// Advisory only: a single sample never confirms or cancels a step on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// Observed step, or `None` when no step was recognised
    #[serde(default)]
    pub step: Option<StepId>,
    /// Hand variant, when the classifier reports one
    #[serde(default)]
    pub orientation: Orientation,
    /// Classifier confidence/quality, nominally 0.0..=1.0
    pub quality: f64,
    /// Monotonic timestamp from the signal source (milliseconds)
    pub timestamp_ms: u64,
}

impl SignalSample {
    /// Sample reporting `step` with unspecified orientation
    pub fn observed(step: StepId, quality: f64, timestamp_ms: u64) -> Self {
        Self {
            step: Some(step),
            orientation: Orientation::Unspecified,
            quality,
            timestamp_ms,
        }
    }

    /// Sample reporting no recognised step
    pub fn none(timestamp_ms: u64) -> Self {
        Self {
            step: None,
            orientation: Orientation::Unspecified,
            quality: 0.0,
            timestamp_ms,
        }
    }

    /// Same sample tagged with a hand variant
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Parse a console line: `<step|none> [quality] [LEFT|RIGHT]`
    pub fn parse_line(line: &str, timestamp_ms: u64) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let head = parts.next()?;
        if head.eq_ignore_ascii_case("none") || head == "-" {
            return Some(Self::none(timestamp_ms));
        }

        let step = StepId::try_from(head.parse::<i64>().ok()?).ok()?;
        let quality = match parts.next() {
            Some(q) => q.parse::<f64>().ok()?,
            None => 1.0,
        };
        let orientation = match parts.next() {
            Some(token) => Orientation::parse_token(token)?,
            None => Orientation::Unspecified,
        };

        Some(Self::observed(step, quality, timestamp_ms).with_orientation(orientation))
    }
}
