//! LED Controller: latch/blink state machine for the sink panel
//!
//! - IDLE: light off; ignored while the step's completed latch is set
//! - CURRENT: 1 Hz blink anchored at first entry; re-entry keeps the anchor
//! - COMPLETED: latch set, light solid on
//!
//! The per-step table is a fixed array indexed by `StepId`, owned by the
//! controller. Time is a monotonic millisecond counter supplied by the caller.

use std::time::Instant;

use tracing::{debug, info};

use crate::types::{HealthReport, StepId, StepState};
use crate::{BLINK_ON_MS, BLINK_PERIOD_MS, STEP_COUNT, VERSION};

/// Physical panel outputs, one per step
pub trait LedOutput {
    /// Drive the light for `step` on or off
    fn write(&mut self, step: StepId, on: bool);
}

impl<T: LedOutput + ?Sized> LedOutput for Box<T> {
    fn write(&mut self, step: StepId, on: bool) {
        (**self).write(step, on)
    }
}

/// In-memory panel: remembers levels and counts writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLeds {
    levels: [bool; STEP_COUNT],
    writes: usize,
}

impl MemoryLeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self, step: StepId) -> bool {
        self.levels[step.index()]
    }

    /// Total hardware writes performed
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl LedOutput for MemoryLeds {
    fn write(&mut self, step: StepId, on: bool) {
        self.levels[step.index()] = on;
        self.writes += 1;
    }
}

/// Panel that reports every level change through `tracing`
#[derive(Debug, Default)]
pub struct TracingLeds;

impl LedOutput for TracingLeds {
    fn write(&mut self, step: StepId, on: bool) {
        debug!(step = step.number(), on, "led write");
    }
}

/// Monotonic millisecond time base
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds since the clock was created
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Result of applying one requested state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Step state changed
    Changed,
    /// Request matched the existing state (e.g. duplicate CURRENT)
    Unchanged,
    /// Completed latch is set; request ignored
    LatchHeld,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LedSlot {
    state: StepState,
    latched: bool,
    /// Blink phase anchor, set on first entry into CURRENT
    anchor_ms: Option<u64>,
    /// Last level written to the output
    level: bool,
}

/// LED controller
#[derive(Debug)]
pub struct LedController<O: LedOutput> {
    slots: [LedSlot; STEP_COUNT],
    current: Option<StepId>,
    output: O,
}

impl<O: LedOutput> LedController<O> {
    /// Create controller with every light off
    pub fn new(output: O) -> Self {
        Self {
            slots: [LedSlot::default(); STEP_COUNT],
            current: None,
            output,
        }
    }

    /// Apply a requested state for `step` at `now_ms`
    pub fn apply(&mut self, step: StepId, state: StepState, now_ms: u64) -> Applied {
        let applied = match state {
            StepState::Idle => self.apply_idle(step),
            StepState::Current => self.apply_current(step, now_ms),
            StepState::Completed => self.apply_completed(step),
        };
        debug!(step = step.number(), state = %state, ?applied, "signal applied");
        applied
    }

    /// Recompute the blink level of the current step
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(step) = self.current {
            let slot = self.slots[step.index()];
            if let Some(anchor) = slot.anchor_ms {
                self.set_level(step, blink_level(anchor, now_ms));
            }
        }
    }

    /// Clear every latch and state; all lights off
    pub fn reset(&mut self) {
        for step in StepId::ALL {
            self.slots[step.index()].state = StepState::Idle;
            self.slots[step.index()].latched = false;
            self.slots[step.index()].anchor_ms = None;
            self.set_level(step, false);
        }
        self.current = None;
        info!("controller reset");
    }

    /// Step currently blinking
    pub fn current(&self) -> Option<StepId> {
        self.current
    }

    pub fn state(&self, step: StepId) -> StepState {
        self.slots[step.index()].state
    }

    pub fn is_latched(&self, step: StepId) -> bool {
        self.slots[step.index()].latched
    }

    /// Last level applied to the output for `step`
    pub fn is_lit(&self, step: StepId) -> bool {
        self.slots[step.index()].level
    }

    /// Phase anchor of a blinking step
    pub fn anchor_ms(&self, step: StepId) -> Option<u64> {
        self.slots[step.index()].anchor_ms
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Health view of what is displayed
    pub fn health(&self, uptime_ms: u64) -> HealthReport {
        HealthReport {
            ok: true,
            current: self.current,
            completed: StepId::ALL.into_iter().filter(|s| self.is_latched(*s)).collect(),
            lit: StepId::ALL.into_iter().filter(|s| self.is_lit(*s)).collect(),
            uptime_ms,
            version: VERSION.to_string(),
        }
    }

    fn apply_idle(&mut self, step: StepId) -> Applied {
        let slot = &mut self.slots[step.index()];
        if slot.latched {
            return Applied::LatchHeld;
        }
        if slot.state == StepState::Idle {
            return Applied::Unchanged;
        }
        slot.state = StepState::Idle;
        slot.anchor_ms = None;
        if self.current == Some(step) {
            self.current = None;
        }
        self.set_level(step, false);
        Applied::Changed
    }

    fn apply_current(&mut self, step: StepId, now_ms: u64) -> Applied {
        let slot = self.slots[step.index()];
        if slot.latched {
            return Applied::LatchHeld;
        }
        if slot.state == StepState::Current {
            // Anchor stays put so duplicates cannot restart the blink
            return Applied::Unchanged;
        }

        if let Some(previous) = self.current.filter(|p| *p != step) {
            // `current` never points at a latched step
            self.apply_idle(previous);
        }

        let slot = &mut self.slots[step.index()];
        slot.state = StepState::Current;
        slot.anchor_ms = Some(now_ms);
        self.current = Some(step);
        self.set_level(step, blink_level(now_ms, now_ms));
        Applied::Changed
    }

    fn apply_completed(&mut self, step: StepId) -> Applied {
        let slot = &mut self.slots[step.index()];
        if slot.latched {
            return Applied::Unchanged;
        }
        slot.latched = true;
        slot.state = StepState::Completed;
        slot.anchor_ms = None;
        if self.current == Some(step) {
            self.current = None;
        }
        self.set_level(step, true);
        Applied::Changed
    }

    /// Write the output only when the level actually changes
    fn set_level(&mut self, step: StepId, on: bool) {
        let slot = &mut self.slots[step.index()];
        if slot.level != on {
            slot.level = on;
            self.output.write(step, on);
        }
    }
}

/// Whether a step blinking since `anchor_ms` is lit at `now_ms`
pub fn blink_level(anchor_ms: u64, now_ms: u64) -> bool {
    now_ms.saturating_sub(anchor_ms) % BLINK_PERIOD_MS < BLINK_ON_MS
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: i64) -> StepId {
        StepId::try_from(n).unwrap()
    }

    fn controller() -> LedController<MemoryLeds> {
        LedController::new(MemoryLeds::new())
    }

    #[test]
    fn test_blink_level_is_1hz_half_duty() {
        assert!(blink_level(100, 100));
        assert!(blink_level(100, 599));
        assert!(!blink_level(100, 600));
        assert!(!blink_level(100, 1099));
        assert!(blink_level(100, 1100));
    }

    #[test]
    fn test_current_blinks_from_anchor() {
        let mut c = controller();
        assert_eq!(c.apply(step(3), StepState::Current, 1000), Applied::Changed);
        assert!(c.output().is_on(step(3)));

        c.tick(1499);
        assert!(c.is_lit(step(3)));
        c.tick(1500);
        assert!(!c.is_lit(step(3)));
        c.tick(2000);
        assert!(c.is_lit(step(3)));
    }

    #[test]
    fn test_duplicate_current_keeps_anchor() {
        let mut c = controller();
        c.apply(step(4), StepState::Current, 1000);
        for t in [1100, 1250, 1600, 1900] {
            assert_eq!(c.apply(step(4), StepState::Current, t), Applied::Unchanged);
        }
        assert_eq!(c.anchor_ms(step(4)), Some(1000));
        c.tick(1600);
        assert!(!c.is_lit(step(4)));
    }

    #[test]
    fn test_switching_current_turns_previous_off() {
        let mut c = controller();
        c.apply(step(2), StepState::Current, 0);
        c.apply(step(5), StepState::Current, 200);

        assert_eq!(c.current(), Some(step(5)));
        assert_eq!(c.state(step(2)), StepState::Idle);
        assert!(!c.is_lit(step(2)));
        assert!(c.is_lit(step(5)));
    }

    #[test]
    fn test_completed_latch_wins() {
        let mut c = controller();
        c.apply(step(6), StepState::Current, 0);
        assert_eq!(c.apply(step(6), StepState::Completed, 300), Applied::Changed);
        assert_eq!(c.current(), None);
        assert!(c.is_lit(step(6)));

        assert_eq!(c.apply(step(6), StepState::Idle, 400), Applied::LatchHeld);
        assert_eq!(c.apply(step(6), StepState::Current, 500), Applied::LatchHeld);
        assert_eq!(c.apply(step(6), StepState::Completed, 600), Applied::Unchanged);

        c.tick(1700);
        assert!(c.is_lit(step(6)));
        assert_eq!(c.state(step(6)), StepState::Completed);
    }

    #[test]
    fn test_switch_away_from_completed_leaves_it_solid() {
        let mut c = controller();
        c.apply(step(3), StepState::Completed, 0);
        c.apply(step(4), StepState::Current, 100);
        c.apply(step(5), StepState::Current, 200);
        assert!(c.is_lit(step(3)));
        assert!(!c.is_lit(step(4)));
    }

    #[test]
    fn test_idle_stops_blinking() {
        let mut c = controller();
        c.apply(step(7), StepState::Current, 0);
        assert_eq!(c.apply(step(7), StepState::Idle, 100), Applied::Changed);
        assert_eq!(c.current(), None);
        c.tick(1000);
        assert!(!c.is_lit(step(7)));
        assert_eq!(c.apply(step(7), StepState::Idle, 200), Applied::Unchanged);
    }

    #[test]
    fn test_reset_clears_latches() {
        let mut c = controller();
        c.apply(step(3), StepState::Completed, 0);
        c.apply(step(5), StepState::Current, 0);
        c.reset();

        let health = c.health(10);
        assert_eq!(health.current, None);
        assert!(health.completed.is_empty());
        assert!(health.lit.is_empty());
        assert_eq!(c.apply(step(3), StepState::Current, 20), Applied::Changed);
    }

    #[test]
    fn test_tick_writes_only_on_level_change() {
        let mut c = controller();
        c.apply(step(2), StepState::Current, 0);
        let after_apply = c.output().writes();
        for t in (0..500).step_by(20) {
            c.tick(t);
        }
        assert_eq!(c.output().writes(), after_apply);
        c.tick(500);
        c.tick(520);
        assert_eq!(c.output().writes(), after_apply + 1);
    }

    #[test]
    fn test_at_most_one_current() {
        let mut c = controller();
        let mut now = 0;
        for n in [2, 3, 3, 4, 2, 7, 7, 5, 6] {
            c.apply(step(n), StepState::Current, now);
            now += 70;
            let blinking = StepId::ALL
                .iter()
                .filter(|s| c.state(**s) == StepState::Current)
                .count();
            assert!(blinking <= 1);
        }
    }
}
