//! Scripted handshake played by the session controller after `connect`.
//!
//! A script is a list of steps, each applied at a fixed offset from the
//! moment the attempt started. Progress may only grow from step to step and
//! the last step must land on exactly 100, which is what marks the attempt as
//! connected. Scripts are validated on construction and on deserialization,
//! so a `HandshakeScript` value always satisfies those rules.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::domain::LogSeverity;
use thiserror::Error;

pub const INITIAL_PROGRESS: u8 = 10;
pub const READY_PROGRESS: u8 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("handshake script has no steps")]
    Empty,
    #[error("step {index} starts at {at_ms}ms, before the previous step at {previous_ms}ms")]
    OffsetRegressed {
        index: usize,
        at_ms: u64,
        previous_ms: u64,
    },
    #[error("step {index} lowers progress from {previous} to {progress}")]
    ProgressRegressed {
        index: usize,
        progress: u8,
        previous: u8,
    },
    #[error("step {index} progress {progress} is above 100")]
    ProgressOutOfRange { index: usize, progress: u8 },
    #[error("step {index} reaches 100 before the last step")]
    CompletesEarly { index: usize },
    #[error("final step must reach 100, got {progress}")]
    IncompleteFinalStep { progress: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedLog {
    pub severity: LogSeverity,
    pub message: String,
}

impl ScriptedLog {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeStep {
    /// Offset from the start of the attempt.
    pub at_ms: u64,
    pub progress: u8,
    pub message: String,
    #[serde(default)]
    pub logs: Vec<ScriptedLog>,
}

impl HandshakeStep {
    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }

    pub fn is_final(&self) -> bool {
        self.progress == READY_PROGRESS
    }
}

#[derive(Debug, Deserialize)]
struct RawHandshakeScript {
    initial_message: String,
    initial_log: String,
    steps: Vec<HandshakeStep>,
}

impl TryFrom<RawHandshakeScript> for HandshakeScript {
    type Error = ScriptError;

    fn try_from(raw: RawHandshakeScript) -> Result<Self, Self::Error> {
        Self::new(raw.initial_message, raw.initial_log, raw.steps)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHandshakeScript")]
pub struct HandshakeScript {
    initial_message: String,
    initial_log: String,
    steps: Vec<HandshakeStep>,
}

impl HandshakeScript {
    pub fn new(
        initial_message: impl Into<String>,
        initial_log: impl Into<String>,
        steps: Vec<HandshakeStep>,
    ) -> Result<Self, ScriptError> {
        validate_steps(&steps)?;
        Ok(Self {
            initial_message: initial_message.into(),
            initial_log: initial_log.into(),
            steps,
        })
    }

    pub fn initial_message(&self) -> &str {
        &self.initial_message
    }

    pub fn initial_log(&self) -> &str {
        &self.initial_log
    }

    pub fn steps(&self) -> &[HandshakeStep] {
        &self.steps
    }

    /// Total time from `connect` until the bridge reports ready.
    pub fn duration(&self) -> Duration {
        self.steps
            .last()
            .map(HandshakeStep::offset)
            .unwrap_or_default()
    }

    /// Returns a copy with every offset multiplied by `factor`. Negative or
    /// non-finite factors collapse all offsets to zero.
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            0.0
        };
        let steps = self
            .steps
            .iter()
            .map(|step| HandshakeStep {
                at_ms: (step.at_ms as f64 * factor).round() as u64,
                ..step.clone()
            })
            .collect();
        Self {
            initial_message: self.initial_message.clone(),
            initial_log: self.initial_log.clone(),
            steps,
        }
    }
}

impl Default for HandshakeScript {
    fn default() -> Self {
        Self {
            initial_message: "Initializing JSON-RPC interface...".into(),
            initial_log: "Starting Model Context Protocol (MCP) client...".into(),
            steps: vec![
                HandshakeStep {
                    at_ms: 600,
                    progress: 30,
                    message: "Locating local server on port 8080...".into(),
                    logs: vec![ScriptedLog::new(
                        LogSeverity::Info,
                        "Attempting to bind to localhost:8080",
                    )],
                },
                HandshakeStep {
                    at_ms: 1500,
                    progress: 50,
                    message: "Handshaking with dev-stack-v1...".into(),
                    logs: vec![
                        ScriptedLog::new(
                            LogSeverity::Success,
                            "Server found: dev-stack-v1 (ver 1.4.2)",
                        ),
                        ScriptedLog::new(
                            LogSeverity::Info,
                            "Negotiating protocol version 2024.11.05...",
                        ),
                    ],
                },
                HandshakeStep {
                    at_ms: 2800,
                    progress: 75,
                    message: "Authenticating session...".into(),
                    logs: vec![
                        ScriptedLog::new(
                            LogSeverity::Success,
                            "Session identity verified: developer_mike",
                        ),
                        ScriptedLog::new(
                            LogSeverity::Info,
                            "Listing available tools and resources...",
                        ),
                    ],
                },
                HandshakeStep {
                    at_ms: 4000,
                    progress: READY_PROGRESS,
                    message: "Connected & ready".into(),
                    logs: vec![
                        ScriptedLog::new(
                            LogSeverity::Success,
                            "Successfully indexed 12 tools and 4 resource templates",
                        ),
                        ScriptedLog::new(LogSeverity::Success, "MCP Bridge active"),
                    ],
                },
            ],
        }
    }
}

fn validate_steps(steps: &[HandshakeStep]) -> Result<(), ScriptError> {
    let Some(last) = steps.last() else {
        return Err(ScriptError::Empty);
    };

    let mut previous_ms = 0;
    let mut previous_progress = INITIAL_PROGRESS;
    for (index, step) in steps.iter().enumerate() {
        if step.progress > READY_PROGRESS {
            return Err(ScriptError::ProgressOutOfRange {
                index,
                progress: step.progress,
            });
        }
        if step.progress < previous_progress {
            return Err(ScriptError::ProgressRegressed {
                index,
                progress: step.progress,
                previous: previous_progress,
            });
        }
        if step.at_ms < previous_ms {
            return Err(ScriptError::OffsetRegressed {
                index,
                at_ms: step.at_ms,
                previous_ms,
            });
        }
        if step.is_final() && index + 1 != steps.len() {
            return Err(ScriptError::CompletesEarly { index });
        }
        previous_ms = step.at_ms;
        previous_progress = step.progress;
    }

    if !last.is_final() {
        return Err(ScriptError::IncompleteFinalStep {
            progress: last.progress,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(at_ms: u64, progress: u8) -> HandshakeStep {
        HandshakeStep {
            at_ms,
            progress,
            message: format!("step at {at_ms}"),
            logs: Vec::new(),
        }
    }

    #[test]
    fn default_script_is_valid_and_ends_ready() {
        let script = HandshakeScript::default();
        assert!(validate_steps(script.steps()).is_ok());
        assert_eq!(script.duration(), Duration::from_millis(4000));
        assert!(script.steps().last().is_some_and(HandshakeStep::is_final));
    }

    #[test]
    fn single_final_step_is_enough() {
        let script = HandshakeScript::new("init", "start", vec![step(100, 100)]).expect("valid");
        assert_eq!(script.steps().len(), 1);
    }

    #[test]
    fn rejects_empty_script() {
        assert_eq!(
            HandshakeScript::new("init", "start", Vec::new()),
            Err(ScriptError::Empty)
        );
    }

    #[test]
    fn rejects_progress_regression() {
        let err = HandshakeScript::new("i", "s", vec![step(10, 60), step(20, 40), step(30, 100)])
            .expect_err("regression");
        assert_eq!(
            err,
            ScriptError::ProgressRegressed {
                index: 1,
                progress: 40,
                previous: 60
            }
        );
    }

    #[test]
    fn rejects_progress_below_initial() {
        let err = HandshakeScript::new("i", "s", vec![step(10, 5), step(20, 100)])
            .expect_err("below initial");
        assert!(matches!(err, ScriptError::ProgressRegressed { index: 0, .. }));
    }

    #[test]
    fn rejects_offsets_out_of_order() {
        let err = HandshakeScript::new("i", "s", vec![step(500, 50), step(200, 100)])
            .expect_err("offset regression");
        assert!(matches!(err, ScriptError::OffsetRegressed { index: 1, .. }));
    }

    #[test]
    fn rejects_script_that_never_completes() {
        let err = HandshakeScript::new("i", "s", vec![step(10, 50), step(20, 90)])
            .expect_err("incomplete");
        assert_eq!(err, ScriptError::IncompleteFinalStep { progress: 90 });
    }

    #[test]
    fn rejects_completion_before_last_step() {
        let err = HandshakeScript::new("i", "s", vec![step(10, 100), step(20, 100)])
            .expect_err("early completion");
        assert_eq!(err, ScriptError::CompletesEarly { index: 0 });
    }

    #[test]
    fn rejects_progress_above_hundred() {
        let err = HandshakeScript::new("i", "s", vec![step(10, 120)]).expect_err("range");
        assert_eq!(
            err,
            ScriptError::ProgressOutOfRange {
                index: 0,
                progress: 120
            }
        );
    }

    #[test]
    fn scaling_preserves_order_and_progress() {
        let script = HandshakeScript::default().scaled(0.5);
        let offsets: Vec<_> = script.steps().iter().map(|s| s.at_ms).collect();
        assert_eq!(offsets, vec![300, 750, 1400, 2000]);

        let instant = HandshakeScript::default().scaled(-3.0);
        assert!(instant.steps().iter().all(|s| s.at_ms == 0));
        assert_eq!(instant.steps().last().map(|s| s.progress), Some(100));
    }

    #[test]
    fn deserialization_validates() {
        let raw = r#"
            initial_message = "boot"
            initial_log = "starting"

            [[steps]]
            at_ms = 50
            progress = 40
            message = "halfway"

            [[steps]]
            at_ms = 20
            progress = 100
            message = "done"
        "#;
        let parsed = toml::from_str::<HandshakeScript>(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn deserializes_valid_script_with_logs() {
        let raw = r#"
            initial_message = "boot"
            initial_log = "starting"

            [[steps]]
            at_ms = 250
            progress = 100
            message = "ready"
            logs = [{ severity = "success", message = "up" }]
        "#;
        let script: HandshakeScript = toml::from_str(raw).expect("valid script");
        assert_eq!(script.initial_message(), "boot");
        assert_eq!(
            script.steps()[0].logs,
            vec![ScriptedLog::new(LogSeverity::Success, "up")]
        );
    }
}
