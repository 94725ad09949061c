//! Evidence accumulation with dropout tolerance
//!
//! Credit rule, per pair of consecutive qualifying samples:
//! - nothing disqualifying in between → credited, capped at max_frame_gap
//! - otherwise it is a dropout: not credited
//! - an interval longer than the tolerance window zeroes the accumulated duration
//!
//! A run whose last qualifying sample is older than the tolerance window is
//! zeroed by `expire` even if no further qualifying sample ever arrives.

use crate::core::config::{OrientationPolicy, StepThreshold};
use crate::types::Orientation;

/// Dropout window parameters (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropoutWindow {
    pub tolerance_ms: u64,
    pub max_frame_gap_ms: u64,
}

/// What one qualifying sample did to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    /// First sample of a fresh run
    Started,
    /// Interval credited
    Accrued(u64),
    /// Dropout inside the tolerance window, duration kept
    Bridged,
    /// Dropout longer than the tolerance window, duration zeroed
    Reset,
}

/// Sustained-duration accumulator for one evidence lane
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    accumulated_ms: u64,
    last_qualifying_ms: Option<u64>,
    interrupted: bool,
}

impl Accumulator {
    /// Credit a qualifying sample at `ts`
    pub fn observe(&mut self, ts: u64, window: DropoutWindow) -> Credit {
        let credit = match self.last_qualifying_ms {
            None => Credit::Started,
            Some(prev) => {
                // Out-of-order timestamps are never credited
                let gap = ts.saturating_sub(prev);
                if gap > window.tolerance_ms {
                    self.accumulated_ms = 0;
                    Credit::Reset
                } else if self.interrupted {
                    Credit::Bridged
                } else {
                    // Slow but clean streams still accrue, one frame gap at a time
                    let credited = gap.min(window.max_frame_gap_ms);
                    self.accumulated_ms += credited;
                    Credit::Accrued(credited)
                }
            }
        };
        self.last_qualifying_ms = Some(self.last_qualifying_ms.map_or(ts, |prev| prev.max(ts)));
        self.interrupted = false;
        credit
    }

    /// Note a disqualifying sample inside the current run
    pub fn interrupt(&mut self) {
        if self.last_qualifying_ms.is_some() {
            self.interrupted = true;
        }
    }

    /// Zero the run if it has been silent longer than the tolerance window.
    /// Returns true when something was discarded.
    pub fn expire(&mut self, now: u64, window: DropoutWindow) -> bool {
        match self.last_qualifying_ms {
            Some(prev) if now.saturating_sub(prev) > window.tolerance_ms => {
                let had_progress = self.accumulated_ms > 0;
                self.clear();
                had_progress
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    pub fn is_running(&self) -> bool {
        self.last_qualifying_ms.is_some()
    }
}

/// Per-step evidence toward CURRENT → COMPLETED, one lane per orientation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEvidence {
    lanes: [Accumulator; Orientation::LANES],
    satisfied: [bool; Orientation::LANES],
    dropouts: u32,
}

impl PendingEvidence {
    /// Credit a qualifying sample and report whether the step is now confirmed
    pub fn observe(
        &mut self,
        ts: u64,
        orientation: Orientation,
        threshold: &StepThreshold,
        policy: OrientationPolicy,
        window: DropoutWindow,
    ) -> bool {
        match target_lane(orientation, threshold, policy) {
            Some(lane) => {
                for (i, other) in self.lanes.iter_mut().enumerate() {
                    if i != lane {
                        other.interrupt();
                    }
                }
                match self.lanes[lane].observe(ts, window) {
                    Credit::Bridged | Credit::Reset => self.dropouts += 1,
                    Credit::Started | Credit::Accrued(_) => {}
                }
                if self.lanes[lane].accumulated_ms() >= threshold.duration_ms {
                    self.satisfied[lane] = true;
                }
            }
            None => self.interrupt(),
        }
        self.is_satisfied(threshold, policy)
    }

    /// Note a disqualifying sample for every lane
    pub fn interrupt(&mut self) {
        for lane in &mut self.lanes {
            lane.interrupt();
        }
    }

    /// Expire stale lanes; true when accumulated progress was discarded
    pub fn expire(&mut self, now: u64, window: DropoutWindow) -> bool {
        let mut discarded = false;
        for lane in &mut self.lanes {
            discarded |= lane.expire(now, window);
        }
        if discarded {
            self.dropouts += 1;
        }
        discarded
    }

    /// Whether the step has met its threshold under `policy`
    pub fn is_satisfied(&self, threshold: &StepThreshold, policy: OrientationPolicy) -> bool {
        if pools(threshold, policy) {
            self.satisfied[Orientation::Unspecified.lane()]
        } else {
            threshold
                .orientations
                .iter()
                .all(|o| self.satisfied[o.lane()])
        }
    }

    /// Qualifying duration credited toward the threshold
    pub fn credited_ms(&self, threshold: &StepThreshold, policy: OrientationPolicy) -> u64 {
        if pools(threshold, policy) {
            return self.lanes[Orientation::Unspecified.lane()].accumulated_ms();
        }
        let mut lanes: Vec<usize> = threshold.orientations.iter().map(|o| o.lane()).collect();
        lanes.sort_unstable();
        lanes.dedup();
        lanes
            .into_iter()
            .map(|lane| {
                if self.satisfied[lane] {
                    threshold.duration_ms
                } else {
                    self.lanes[lane].accumulated_ms().min(threshold.duration_ms)
                }
            })
            .sum()
    }

    /// Orientation lanes that reached the threshold
    pub fn satisfied_orientations(&self) -> Vec<Orientation> {
        [Orientation::Left, Orientation::Right]
            .into_iter()
            .filter(|o| self.satisfied[o.lane()])
            .collect()
    }

    pub fn dropouts(&self) -> u32 {
        self.dropouts
    }
}

fn pools(threshold: &StepThreshold, policy: OrientationPolicy) -> bool {
    policy == OrientationPolicy::Pooled || threshold.orientations.is_empty()
}

/// Lane a sample credits, or `None` when it cannot be attributed
fn target_lane(
    orientation: Orientation,
    threshold: &StepThreshold,
    policy: OrientationPolicy,
) -> Option<usize> {
    if pools(threshold, policy) {
        Some(Orientation::Unspecified.lane())
    } else if threshold.orientations.contains(&orientation) {
        Some(orientation.lane())
    } else {
        None
    }
}
