//! Session Interpreter: per-step state machines over a noisy sample stream
//!
//! State transitions (per step):
//! - IDLE → CURRENT: qualifying sample, nothing else current (or pre-emption)
//! - CURRENT → IDLE: another step pre-empts it
//! - CURRENT → COMPLETED: credited duration reaches the step threshold
//! - COMPLETED: terminal until `reset`
//!
//! Every change of a step's state is returned exactly once as a `StepEvent`.

use tracing::{debug, info};

use crate::core::config::{InterpreterConfig, OrientationPolicy, StepThreshold};
use crate::core::evidence::{DropoutWindow, PendingEvidence};
use crate::types::{ReasonCode, SignalSample, StepEvent, StepId, StepState, StepStatus};
use crate::STEP_COUNT;

/// One step's slot in the session table
#[derive(Debug, Clone, Default)]
struct StepSlot {
    state: StepState,
    evidence: PendingEvidence,
    completed_at_ms: Option<u64>,
}

/// Candidate step collecting consecutive samples toward pre-emption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Challenger {
    step: StepId,
    samples: u32,
}

/// Session interpreter
#[derive(Debug)]
pub struct SessionInterpreter {
    thresholds: [StepThreshold; STEP_COUNT],
    policy: OrientationPolicy,
    window: DropoutWindow,
    preempt_min_samples: u32,
    slots: [StepSlot; STEP_COUNT],
    current: Option<StepId>,
    challenger: Option<Challenger>,
    sample_count: u64,
}

impl Default for SessionInterpreter {
    fn default() -> Self {
        Self::new(&InterpreterConfig::default())
    }
}

impl SessionInterpreter {
    /// Create interpreter with an all-IDLE session
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            thresholds: config.threshold_table(),
            policy: config.orientation_policy,
            window: DropoutWindow {
                tolerance_ms: config.dropout_tolerance_ms,
                max_frame_gap_ms: config.max_frame_gap_ms,
            },
            preempt_min_samples: config.preempt_min_samples.max(1),
            slots: Default::default(),
            current: None,
            challenger: None,
            sample_count: 0,
        }
    }

    /// Consume one sample, return the state changes it caused
    pub fn process(&mut self, sample: &SignalSample) -> Vec<StepEvent> {
        self.sample_count += 1;
        let ts = sample.timestamp_ms;
        let mut events = Vec::new();

        if let Some(current) = self.current {
            let slot = &mut self.slots[current.index()];
            if slot.evidence.expire(ts, self.window) {
                debug!(step = %current, at_ms = ts, "evidence expired after dropout");
            }
        }

        let qualifying = sample.step.filter(|step| self.qualifies(*step, sample.quality));

        match qualifying {
            None => self.disqualify_current(),
            Some(step) if self.slots[step.index()].state == StepState::Completed => {
                // Completed steps ignore further samples; for the current step
                // this is just noise
                self.disqualify_current();
            }
            Some(step) if Some(step) == self.current => {
                self.challenger = None;
                self.accumulate(step, sample, &mut events);
            }
            Some(step) => match self.current {
                None => {
                    self.challenger = None;
                    self.enter_current(step, ReasonCode::T001_ENTERED_CURRENT, ts, &mut events);
                    self.accumulate(step, sample, &mut events);
                }
                Some(previous) => {
                    self.slots[previous.index()].evidence.interrupt();
                    if self.challenge(step) {
                        self.revert_to_idle(previous, ts, &mut events);
                        self.enter_current(step, ReasonCode::T001_TOOK_OVER_CURRENT, ts, &mut events);
                        self.accumulate(step, sample, &mut events);
                    }
                }
            },
        }

        events
    }

    /// Return every step to IDLE and drop all evidence.
    ///
    /// The only operation that un-latches COMPLETED steps.
    pub fn reset(&mut self, at_ms: u64) -> Vec<StepEvent> {
        let events: Vec<StepEvent> = StepId::ALL
            .iter()
            .filter(|step| self.slots[step.index()].state != StepState::Idle)
            .map(|step| StepEvent::new(*step, StepState::Idle, ReasonCode::T004_SESSION_RESET, at_ms))
            .collect();

        self.slots = Default::default();
        self.current = None;
        self.challenger = None;
        info!(reverted = events.len(), "session reset");
        events
    }

    /// All six steps confirmed
    pub fn is_compliant(&self) -> bool {
        self.slots.iter().all(|slot| slot.state == StepState::Completed)
    }

    pub fn completed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state == StepState::Completed)
            .count()
    }

    /// Step holding the current pointer
    pub fn current(&self) -> Option<StepId> {
        self.current
    }

    pub fn state(&self, step: StepId) -> StepState {
        self.slots[step.index()].state
    }

    /// Samples consumed since creation
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Read-only view of every step
    pub fn snapshot(&self) -> Vec<StepStatus> {
        StepId::ALL
            .iter()
            .map(|step| {
                let slot = &self.slots[step.index()];
                let threshold = &self.thresholds[step.index()];
                let credited_ms = match slot.state {
                    StepState::Completed => threshold.duration_ms,
                    _ => slot.evidence.credited_ms(threshold, self.policy),
                };
                let required_ms = if self.independent(threshold) {
                    threshold.duration_ms * threshold.orientations.len() as u64
                } else {
                    threshold.duration_ms
                };
                StepStatus {
                    step: *step,
                    state: slot.state,
                    is_current: self.current == Some(*step),
                    credited_ms,
                    required_ms,
                    dropouts: slot.evidence.dropouts(),
                    completed_at_ms: slot.completed_at_ms,
                    satisfied: slot.evidence.satisfied_orientations(),
                }
            })
            .collect()
    }

    fn qualifies(&self, step: StepId, quality: f64) -> bool {
        quality.is_finite() && quality >= self.thresholds[step.index()].quality_min
    }

    fn independent(&self, threshold: &StepThreshold) -> bool {
        self.policy == OrientationPolicy::Independent && !threshold.orientations.is_empty()
    }

    fn disqualify_current(&mut self) {
        self.challenger = None;
        if let Some(current) = self.current {
            self.slots[current.index()].evidence.interrupt();
        }
    }

    /// Count a qualifying sample for a would-be pre-emptor; true once it has enough
    fn challenge(&mut self, step: StepId) -> bool {
        let samples = match self.challenger {
            Some(c) if c.step == step => c.samples + 1,
            _ => 1,
        };
        if samples >= self.preempt_min_samples {
            self.challenger = None;
            true
        } else {
            self.challenger = Some(Challenger { step, samples });
            false
        }
    }

    fn enter_current(&mut self, step: StepId, reason: ReasonCode, ts: u64, events: &mut Vec<StepEvent>) {
        let window = self.window;
        let slot = &mut self.slots[step.index()];
        slot.state = StepState::Current;
        // Evidence from a recent stint survives; a stale one is dropped here
        slot.evidence.expire(ts, window);
        self.current = Some(step);
        debug!(step = %step, at_ms = ts, reason = reason.code(), "step current");
        events.push(StepEvent::new(step, StepState::Current, reason, ts));
    }

    fn revert_to_idle(&mut self, step: StepId, ts: u64, events: &mut Vec<StepEvent>) {
        let slot = &mut self.slots[step.index()];
        slot.state = StepState::Idle;
        slot.evidence.interrupt();
        if self.current == Some(step) {
            self.current = None;
        }
        debug!(step = %step, at_ms = ts, "step pre-empted");
        events.push(StepEvent::new(step, StepState::Idle, ReasonCode::T002_PREEMPTED, ts));
    }

    fn accumulate(&mut self, step: StepId, sample: &SignalSample, events: &mut Vec<StepEvent>) {
        let threshold = &self.thresholds[step.index()];
        let slot = &mut self.slots[step.index()];
        let confirmed = slot.evidence.observe(
            sample.timestamp_ms,
            sample.orientation,
            threshold,
            self.policy,
            self.window,
        );
        if !confirmed {
            return;
        }

        slot.state = StepState::Completed;
        slot.completed_at_ms = Some(sample.timestamp_ms);
        if self.current == Some(step) {
            self.current = None;
        }
        events.push(StepEvent::new(
            step,
            StepState::Completed,
            ReasonCode::T003_CONFIRMED,
            sample.timestamp_ms,
        ));
        info!(
            step = %step,
            at_ms = sample.timestamp_ms,
            completed = self.completed_count(),
            "step confirmed"
        );
        if self.is_compliant() {
            info!("all steps confirmed - session compliant");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
