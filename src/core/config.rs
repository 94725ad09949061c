//! Configuration loading and validation.
//!
//! One YAML document with `interpreter`, `feedback` and `controller` sections.
//! Every field has a default, so an empty file is a valid configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Orientation, StepId};
use crate::{
    DEFAULT_CONFIRMATION_MS, DEFAULT_DROPOUT_TOLERANCE_MS, DEFAULT_FEEDBACK_RETRIES,
    DEFAULT_FEEDBACK_TIMEOUT_MS, DEFAULT_HEALTH_INTERVAL_MS, DEFAULT_MAX_FRAME_GAP_MS,
    DEFAULT_PREEMPT_MIN_SAMPLES, DEFAULT_QUALITY_MIN, DEFAULT_TICK_MS, MAX_FEEDBACK_RETRIES,
    STEP_COUNT,
};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Whether orientation variants of a step share one accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrientationPolicy {
    /// Evidence from any orientation counts toward one threshold
    #[default]
    Pooled,
    /// Each required orientation must reach the threshold on its own
    Independent,
}

/// Confirmation requirements for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepThreshold {
    /// Sustained qualifying duration to confirm (milliseconds)
    pub duration_ms: u64,
    /// Minimum sample quality counted as evidence
    pub quality_min: f64,
    /// Orientations that must each qualify under `INDEPENDENT`
    pub orientations: Vec<Orientation>,
}

impl Default for StepThreshold {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_CONFIRMATION_MS,
            quality_min: DEFAULT_QUALITY_MIN,
            orientations: Vec::new(),
        }
    }
}

/// Session interpreter tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub dropout_tolerance_ms: u64,
    pub max_frame_gap_ms: u64,
    pub preempt_min_samples: u32,
    pub orientation_policy: OrientationPolicy,
    /// Threshold used by steps without an override
    pub default_step: StepThreshold,
    /// Per-step overrides keyed by step number
    pub steps: BTreeMap<StepId, StepThreshold>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            dropout_tolerance_ms: DEFAULT_DROPOUT_TOLERANCE_MS,
            max_frame_gap_ms: DEFAULT_MAX_FRAME_GAP_MS,
            preempt_min_samples: DEFAULT_PREEMPT_MIN_SAMPLES,
            orientation_policy: OrientationPolicy::default(),
            default_step: StepThreshold::default(),
            steps: BTreeMap::new(),
        }
    }
}

impl InterpreterConfig {
    /// Effective threshold for `step`
    pub fn threshold(&self, step: StepId) -> &StepThreshold {
        self.steps.get(&step).unwrap_or(&self.default_step)
    }

    /// Effective thresholds as a fixed table indexed by [`StepId::index`]
    pub fn threshold_table(&self) -> [StepThreshold; STEP_COUNT] {
        std::array::from_fn(|i| self.threshold(StepId::ALL[i]).clone())
    }

    /// Same config with every step sharing `duration_ms`
    pub fn with_confirmation_ms(mut self, duration_ms: u64) -> Self {
        self.default_step.duration_ms = duration_ms;
        for threshold in self.steps.values_mut() {
            threshold.duration_ms = duration_ms;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preempt_min_samples == 0 {
            return Err(ConfigError::Invalid(
                "interpreter.preempt_min_samples must be > 0".to_string(),
            ));
        }
        if self.max_frame_gap_ms > self.dropout_tolerance_ms {
            return Err(ConfigError::Invalid(format!(
                "interpreter.max_frame_gap_ms ({}) must not exceed dropout_tolerance_ms ({})",
                self.max_frame_gap_ms, self.dropout_tolerance_ms
            )));
        }
        validate_threshold("interpreter.default_step", &self.default_step)?;
        for (step, threshold) in &self.steps {
            validate_threshold(&format!("interpreter.steps.{}", step.number()), threshold)?;
        }
        Ok(())
    }
}

fn validate_threshold(path: &str, threshold: &StepThreshold) -> Result<(), ConfigError> {
    if threshold.duration_ms == 0 {
        return Err(ConfigError::Invalid(format!("{}.duration_ms must be > 0", path)));
    }
    if !(0.0..=1.0).contains(&threshold.quality_min) {
        return Err(ConfigError::Invalid(format!(
            "{}.quality_min must be within 0.0..=1.0",
            path
        )));
    }
    if threshold.orientations.contains(&Orientation::Unspecified) {
        return Err(ConfigError::Invalid(format!(
            "{}.orientations may only list LEFT or RIGHT",
            path
        )));
    }
    for (i, orientation) in threshold.orientations.iter().enumerate() {
        if threshold.orientations[..i].contains(orientation) {
            return Err(ConfigError::Invalid(format!(
                "{}.orientations lists {:?} twice",
                path, orientation
            )));
        }
    }
    Ok(())
}

/// Feedback transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub enabled: bool,
    /// Controller base URL, e.g. `http://esp8266.local`
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub retries: u32,
    /// Health probe interval, 0 disables probing
    pub health_interval_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_ms: DEFAULT_FEEDBACK_TIMEOUT_MS,
            retries: DEFAULT_FEEDBACK_RETRIES,
            health_interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
        }
    }
}

impl FeedbackConfig {
    /// Enabled config pointing at `endpoint`
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            enabled: true,
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Endpoint with any trailing `/` or `/signal` removed
    pub fn base_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim();
        let endpoint = endpoint.strip_suffix("/signal").unwrap_or(endpoint);
        let endpoint = endpoint.trim_end_matches('/');
        if endpoint.is_empty() {
            None
        } else {
            Some(endpoint.to_string())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("feedback.timeout_ms must be > 0".to_string()));
        }
        if self.retries > MAX_FEEDBACK_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "feedback.retries must be <= {}",
                MAX_FEEDBACK_RETRIES
            )));
        }
        if self.enabled && self.base_url().is_none() {
            return Err(ConfigError::Invalid(
                "feedback.endpoint is required when feedback is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// LED controller server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub addr: String,
    pub tick_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub interpreter: InterpreterConfig,
    pub feedback: FeedbackConfig,
    pub controller: ControllerConfig,
}

impl AppConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interpreter.validate()?;
        self.feedback.validate()?;
        if self.controller.tick_ms == 0 {
            return Err(ConfigError::Invalid("controller.tick_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Load full configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    AppConfig::from_yaml_str(&content)
}
