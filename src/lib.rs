//! DeltaWash: handwashing step interpreter and LED feedback controller
//!
//! Classifier samples → SessionInterpreter → FeedbackTransport → LED controller

pub mod core;
pub mod types;

// =============================================================================
// STEPS
// =============================================================================

/// Number of tracked hand-cleaning steps (2..=7)
pub const STEP_COUNT: usize = 6;

/// Lowest tracked step id
pub const FIRST_STEP: u8 = 2;

/// Highest tracked step id
pub const LAST_STEP: u8 = 7;

// =============================================================================
// INTERPRETER DEFAULTS [C] - overridable from config
// =============================================================================

/// Sustained qualifying duration needed to confirm a step (milliseconds)
pub const DEFAULT_CONFIRMATION_MS: u64 = 3000;

/// Minimum classifier quality for a sample to count as evidence
pub const DEFAULT_QUALITY_MIN: f64 = 0.7;

/// Longest absence of qualifying samples that keeps accumulated duration
pub const DEFAULT_DROPOUT_TOLERANCE_MS: u64 = 200;

/// Most credit a single clean interval between qualifying samples earns
/// (about three frames at 30 fps)
pub const DEFAULT_MAX_FRAME_GAP_MS: u64 = 100;

/// Consecutive qualifying samples a different step needs to pre-empt CURRENT
pub const DEFAULT_PREEMPT_MIN_SAMPLES: u32 = 1;

// =============================================================================
// LED PANEL [C] - fixed 1 Hz, 50% duty
// =============================================================================

/// Full blink period (milliseconds)
pub const BLINK_PERIOD_MS: u64 = 1000;

/// Lit portion of each blink period (milliseconds)
pub const BLINK_ON_MS: u64 = 500;

/// Render loop tick (milliseconds)
pub const DEFAULT_TICK_MS: u64 = 20;

// =============================================================================
// FEEDBACK TRANSPORT DEFAULTS
// =============================================================================

/// Per-request timeout (milliseconds)
pub const DEFAULT_FEEDBACK_TIMEOUT_MS: u64 = 500;

/// Immediate retries after a failed delivery
pub const DEFAULT_FEEDBACK_RETRIES: u32 = 1;

/// Upper bound on configured retries
pub const MAX_FEEDBACK_RETRIES: u32 = 5;

/// Health probe interval (milliseconds, 0 disables)
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 5000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.3.0";
