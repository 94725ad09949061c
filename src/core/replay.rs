//! Replay recorded classifier samples through the interpreter
//!
//! Input is JSON lines, one `SignalSample` per line:
//! `{"step": 4, "quality": 0.92, "timestamp_ms": 1200, "orientation": "LEFT"}`
//! Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::core::interpreter::SessionInterpreter;
use crate::core::transport::FeedbackTransport;
use crate::types::{SignalSample, StepEvent, StepStatus};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of one replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub samples: usize,
    pub events: Vec<StepEvent>,
    pub compliant: bool,
    pub statuses: Vec<StepStatus>,
}

/// Parse JSON-lines samples
pub fn parse_samples(content: &str) -> Result<Vec<SignalSample>, ReplayError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line.trim()).map_err(|source| ReplayError::Parse { line: i + 1, source })
        })
        .collect()
}

/// Load samples from a JSON-lines file
pub fn load_samples(path: &Path) -> Result<Vec<SignalSample>, ReplayError> {
    let content = fs::read_to_string(path)?;
    parse_samples(&content)
}

/// Feed `samples` through `interpreter`, forwarding every event to `transport`.
///
/// With `realtime` the replay sleeps between samples to match recorded spacing.
pub async fn replay(
    samples: &[SignalSample],
    interpreter: &mut SessionInterpreter,
    transport: &FeedbackTransport,
    realtime: bool,
    mut on_event: impl FnMut(&StepEvent),
) -> ReplaySummary {
    let mut events = Vec::new();
    let mut previous_ts: Option<u64> = None;

    for sample in samples {
        if realtime {
            if let Some(prev) = previous_ts {
                let wait = sample.timestamp_ms.saturating_sub(prev);
                if wait > 0 {
                    tokio::time::sleep(Duration::from_millis(wait)).await;
                }
            }
            previous_ts = Some(sample.timestamp_ms);
        }

        let produced = interpreter.process(sample);
        transport.publish_all(&produced);
        for event in &produced {
            on_event(event);
        }
        events.extend(produced);
    }

    let summary = ReplaySummary {
        samples: samples.len(),
        events,
        compliant: interpreter.is_compliant(),
        statuses: interpreter.snapshot(),
    };
    info!(
        samples = summary.samples,
        events = summary.events.len(),
        compliant = summary.compliant,
        "replay finished"
    );
    summary
}
