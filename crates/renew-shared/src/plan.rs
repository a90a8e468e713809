//! Command plans and their human-readable results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker prefixed to a step that succeeded
pub const SUCCESS_MARKER: &str = "✓";

/// Marker prefixed to a step that failed
pub const FAILURE_MARKER: &str = "✗";

/// Detail used when a failed command produced no output at all
pub const DEFAULT_FAILURE_DETAIL: &str = "command execution failed";

/// One external program invocation: program name followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    tokens: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// Result of running a single command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub succeeded: bool,
    /// Decoded combined output, trimmed
    pub output: String,
}

impl CommandOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
        }
    }
}

/// One line of status for a plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub succeeded: bool,
    pub line: String,
}

impl StepReport {
    pub fn succeeded(command: &CommandSpec) -> Self {
        Self {
            succeeded: true,
            line: format!("{} {}", SUCCESS_MARKER, command),
        }
    }

    /// Failed step; empty or whitespace-only detail falls back to
    /// [`DEFAULT_FAILURE_DETAIL`].
    pub fn failed(command: &CommandSpec, detail: &str) -> Self {
        let detail = detail.trim();
        let detail = if detail.is_empty() {
            DEFAULT_FAILURE_DETAIL
        } else {
            detail
        };
        Self {
            succeeded: false,
            line: format!("{} {}: {}", FAILURE_MARKER, command, detail),
        }
    }

    pub fn from_outcome(command: &CommandSpec, outcome: &CommandOutcome) -> Self {
        if outcome.succeeded {
            Self::succeeded(command)
        } else {
            Self::failed(command, &outcome.output)
        }
    }

    /// Informational line that is neither a success nor a failure of a command
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            line: text.into(),
        }
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Ordered step reports of one orchestrated plan, rendered newline-joined
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResult {
    steps: Vec<StepReport>,
}

impl PlanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(step: StepReport) -> Self {
        Self { steps: vec![step] }
    }

    pub fn push(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.succeeded)
    }
}

impl fmt::Display for PlanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&step.line)?;
        }
        Ok(())
    }
}
