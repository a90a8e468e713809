//! Command Executor
//!
//! Runs one external command with captured stdout/stderr and a timeout,
//! decodes the output for the host console and reports the outcome.
//!
//! ## Usage
//!
//! Production code uses `RealCommandRunner` which launches processes.
//! Test code uses `FakeCommandRunner` with scripted responses; it records
//! every command it is asked to run.

use async_trait::async_trait;
use renew_shared::{CommandOutcome, CommandSpec, RenewError};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::decoder::OutputDecoder;

// ============================================================================
// Command Runner Trait
// ============================================================================

/// Runs one command.
///
/// `Ok` means the process ran to completion (successfully or not);
/// `Err` means it could not be launched or did not finish in time.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec, timeout: Duration)
        -> Result<CommandOutcome, RenewError>;
}

/// Run a command and fold launch faults and timeouts into a failed outcome
pub async fn execute(
    runner: &dyn CommandRunner,
    command: &CommandSpec,
    timeout: Duration,
) -> CommandOutcome {
    match runner.run(command, timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("{} failed: {}", command, e);
            CommandOutcome::failure(e.to_string())
        }
    }
}

// ============================================================================
// Real Command Runner (Production)
// ============================================================================

/// Launches real processes; output is decoded with the host decoder
pub struct RealCommandRunner {
    decoder: OutputDecoder,
}

impl RealCommandRunner {
    pub fn new(decoder: OutputDecoder) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> OutputDecoder {
        self.decoder
    }
}

impl Default for RealCommandRunner {
    fn default() -> Self {
        Self::new(OutputDecoder::utf8())
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutcome, RenewError> {
        let program = command.program().ok_or(RenewError::EmptyCommand)?;

        info!("Executing: {}", command);

        // kill_on_drop: a process that outlives its timeout is reaped
        let child = Command::new(program)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenewError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RenewError::Timeout {
                    command: command.to_string(),
                    secs: timeout.as_secs(),
                })
            }
        };

        let text = combine_output(&self.decoder, &output.stdout, &output.stderr);
        debug!("{} exited with {}", command, output.status);

        Ok(CommandOutcome {
            succeeded: output.status.success(),
            output: text,
        })
    }
}

/// Decode stdout then stderr, newline-join their lines and trim
pub fn combine_output(decoder: &OutputDecoder, stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = decoder.decode(stdout);
    let stderr = decoder.decode(stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ============================================================================
// Fake Command Runner (Testing)
// ============================================================================

#[derive(Debug, Clone)]
enum FakeResult {
    Completed(CommandOutcome),
    Timeout,
    SpawnError(String),
    Panic,
}

/// Scripted response for one command line
#[derive(Debug, Clone)]
pub struct FakeResponse {
    result: FakeResult,
    delay: Option<Duration>,
}

impl FakeResponse {
    /// Process exited with status 0
    pub fn ok(output: &str) -> Self {
        Self {
            result: FakeResult::Completed(CommandOutcome::success(output)),
            delay: None,
        }
    }

    /// Process exited with a non-zero status
    pub fn fail(output: &str) -> Self {
        Self {
            result: FakeResult::Completed(CommandOutcome::failure(output)),
            delay: None,
        }
    }

    /// Process did not finish within its timeout
    pub fn timeout() -> Self {
        Self {
            result: FakeResult::Timeout,
            delay: None,
        }
    }

    /// Process could not be launched
    pub fn spawn_error(message: &str) -> Self {
        Self {
            result: FakeResult::SpawnError(message.to_string()),
            delay: None,
        }
    }

    /// The runner itself blows up
    pub fn panic() -> Self {
        Self {
            result: FakeResult::Panic,
            delay: None,
        }
    }

    /// Hold the response back for `delay` before returning it
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Fake runner for deterministic testing.
///
/// Responses are keyed by the full command line ("dhclient -r eth0").
/// Unscripted commands get the default response, which succeeds with no
/// output unless changed with [`FakeCommandRunner::with_default`].
pub struct FakeCommandRunner {
    responses: HashMap<String, FakeResponse>,
    default_response: FakeResponse,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: FakeResponse::ok(""),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond(mut self, command_line: &str, response: FakeResponse) -> Self {
        self.responses.insert(command_line.to_string(), response);
        self
    }

    pub fn with_default(mut self, response: FakeResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Command lines run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn reset_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for FakeCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutcome, RenewError> {
        let line = command.to_string();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());

        let response = self
            .responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        match response.result {
            FakeResult::Completed(outcome) => Ok(outcome),
            FakeResult::Timeout => Err(RenewError::Timeout {
                command: line,
                secs: timeout.as_secs(),
            }),
            FakeResult::SpawnError(message) => Err(RenewError::Spawn {
                command: line,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
            }),
            FakeResult::Panic => panic!("fake runner panic while running {}", line),
        }
    }
}
