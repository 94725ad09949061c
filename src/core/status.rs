//! Console status board: STEP | STATE | MS grid
//!
//! `>` marks the current step, `*` a completed one.

use colored::Colorize;

use crate::types::{StepState, StepStatus};

/// Renders interpreter snapshots for the terminal
#[derive(Debug, Clone, Copy)]
pub struct StatusBoard {
    color: bool,
}

impl StatusBoard {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn render(&self, statuses: &[StepStatus]) -> String {
        let mut lines = vec![
            "STEP | STATE     | MS".to_string(),
            "---------------------------".to_string(),
        ];
        for status in statuses {
            let marker = match (status.state, status.is_current) {
                (StepState::Completed, _) => '*',
                (_, true) => '>',
                _ => ' ',
            };
            let row = format!(
                "{}{:<3} | {:<9} | {:05}/{:05}",
                marker,
                status.step.number(),
                status.state.to_string(),
                status.credited_ms.min(99_999),
                status.required_ms.min(99_999),
            );
            lines.push(self.paint(row, status.state));
        }
        let done = statuses
            .iter()
            .filter(|s| s.state == StepState::Completed)
            .count();
        lines.push(format!("{}/{} steps confirmed", done, statuses.len()));
        lines.join("\n")
    }

    fn paint(&self, row: String, state: StepState) -> String {
        if !self.color {
            return row;
        }
        match state {
            StepState::Idle => row.dimmed().to_string(),
            StepState::Current => row.yellow().to_string(),
            StepState::Completed => row.green().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::InterpreterConfig;
    use crate::core::interpreter::SessionInterpreter;
    use crate::types::{SignalSample, StepId};

    #[test]
    fn test_plain_render_marks_rows() {
        let mut interp = SessionInterpreter::new(&InterpreterConfig::default().with_confirmation_ms(100));
        let s2 = StepId::try_from(2).unwrap();
        let s3 = StepId::try_from(3).unwrap();
        for ts in (0..=100).step_by(50) {
            interp.process(&SignalSample::observed(s2, 0.9, ts));
        }
        interp.process(&SignalSample::observed(s3, 0.9, 200));

        let text = StatusBoard::new(false).render(&interp.snapshot());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 + 6 + 1);
        assert!(lines[2].starts_with("*2"));
        assert!(lines[2].contains("COMPLETED"));
        assert!(lines[3].starts_with(">3"));
        assert!(lines[4].starts_with(" 4"));
        assert_eq!(lines[8], "1/6 steps confirmed");
    }
}
