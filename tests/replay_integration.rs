//! Integration tests for replaying recorded sample files

use std::io::Write;

use deltawash::core::{
    load_config, load_samples, replay, FeedbackTransport, ReplayError, SessionInterpreter,
    StatusBoard,
};
use deltawash::types::{StepEvent, StepState};
use tempfile::NamedTempFile;

/// JSON lines: each step held for 300 ms in turn, with a noise frame between steps
fn recorded_session() -> String {
    let mut lines = vec!["# sink 2, camera A".to_string()];
    for (i, step) in [2, 3, 4, 5, 6, 7].iter().enumerate() {
        let base = i as u64 * 1000;
        for ts in (base..=base + 300).step_by(50) {
            lines.push(format!(
                r#"{{"step": {}, "quality": 0.92, "timestamp_ms": {}}}"#,
                step, ts
            ));
        }
        lines.push(format!(
            r#"{{"step": null, "quality": 0.0, "timestamp_ms": {}}}"#,
            base + 500
        ));
    }
    lines.join("\n")
}

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_replay_file_reaches_compliance() {
    let samples_file = write_temp(&recorded_session());
    let config_file = write_temp("interpreter:\n  default_step:\n    duration_ms: 300\n");

    let config = load_config(config_file.path()).unwrap();
    let samples = load_samples(samples_file.path()).unwrap();
    assert_eq!(samples.len(), 6 * 8);

    let mut interpreter = SessionInterpreter::new(&config.interpreter);
    let transport = FeedbackTransport::disabled();
    let mut seen: Vec<StepEvent> = Vec::new();
    let summary = replay(&samples, &mut interpreter, &transport, false, |e| seen.push(e.clone())).await;

    assert!(summary.compliant);
    assert_eq!(summary.samples, 48);
    assert_eq!(summary.events.len(), 12);
    assert_eq!(seen.len(), summary.events.len());
    assert_eq!(
        summary
            .events
            .iter()
            .filter(|e| e.state == StepState::Completed)
            .count(),
        6
    );

    let board = StatusBoard::new(false).render(&summary.statuses);
    assert!(board.ends_with("6/6 steps confirmed"));
}

#[tokio::test]
async fn test_replay_json_summary_serializes() {
    let samples_file = write_temp(&recorded_session());
    let samples = load_samples(samples_file.path()).unwrap();
    let mut interpreter = SessionInterpreter::default();

    let summary = replay(&samples, &mut interpreter, &FeedbackTransport::disabled(), false, |_| {}).await;
    // Default 3 s confirmation: every step became current, none confirmed
    assert!(!summary.compliant);
    assert!(summary.events.iter().all(|e| e.state != StepState::Completed));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["samples"], 48);
    assert_eq!(json["statuses"].as_array().unwrap().len(), 6);
    assert_eq!(json["events"][0]["state"], "CURRENT");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_samples(&dir.path().join("absent.jsonl")) {
        Err(ReplayError::Io(_)) => {}
        other => panic!("expected IO error, got {:?}", other.map(|s| s.len())),
    }
}
