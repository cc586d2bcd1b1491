//! Claude backend implementation.
//!
//! Invokes the Claude CLI with `--print --output-format json --tools ""` and
//! unwraps the metadata envelope it prints around the model's answer. The
//! instructions go through `--append-system-prompt`; stdin carries only the
//! transcript.

use super::{
    cli_failure, run_cli, BackendError, BackendResult, ClassifierBackend, ClassifyRequest,
};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;

/// Backend for Claude CLI.
#[derive(Debug, Clone, Default)]
pub struct ClaudeBackend {
    /// Extra CLI arguments to pass before the stdin passthrough args.
    extra_args: Vec<String>,
}

impl ClaudeBackend {
    pub fn new() -> Self {
        Self {
            extra_args: Vec::new(),
        }
    }

    /// Create a Claude backend with extra CLI arguments (e.g. `--model`).
    pub fn with_extra_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    fn command() -> &'static str {
        "claude"
    }

    /// Arguments for one run with `system` as the appended system prompt.
    fn args(&self, system: &str) -> Vec<String> {
        let mut args: Vec<String> = ["--print", "--output-format", "json"]
            .into_iter()
            .map(String::from)
            .collect();
        args.push("--append-system-prompt".to_string());
        args.push(system.trim_end().to_string());
        args.extend(self.extra_args.iter().cloned());
        // Disable tools; "-p -" reads the prompt from stdin (avoids ARG_MAX limits)
        args.extend(["--tools", "", "-p", "-"].into_iter().map(String::from));
        args
    }
}

impl ClassifierBackend for ClaudeBackend {
    fn name(&self) -> &'static str {
        "Claude"
    }

    fn is_available(&self) -> bool {
        super::command_exists(Self::command())
    }

    fn invoke(&self, request: &ClassifyRequest, timeout: Duration) -> BackendResult<String> {
        if !self.is_available() {
            return Err(BackendError::NotAvailable(
                "claude CLI not found in PATH".to_string(),
            ));
        }

        let mut cmd = Command::new(Self::command());
        cmd.args(self.args(&request.system));

        let output = run_cli(cmd, &request.user, timeout)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() {
            unwrap_envelope(&stdout)
        } else {
            // Claude CLI may exit 1 but put the error in the stdout envelope
            Err(cli_failure(&output, envelope_error(&stdout)))
        }
    }
}

/// Claude CLI wrapper format when using `--output-format json`:
/// `{"type":"result","result":"...","is_error":false,...}`
#[derive(Debug, Deserialize)]
struct ClaudeEnvelope {
    #[serde(rename = "type")]
    response_type: Option<String>,
    result: Option<String>,
    is_error: Option<bool>,
}

/// Return the model text inside Claude's envelope.
///
/// Output that is not an envelope is passed through unchanged.
fn unwrap_envelope(stdout: &str) -> BackendResult<String> {
    let trimmed = stdout.trim();
    let Ok(envelope) = serde_json::from_str::<ClaudeEnvelope>(trimmed) else {
        return Ok(trimmed.to_string());
    };
    if envelope.response_type.as_deref() != Some("result") {
        return Ok(trimmed.to_string());
    }

    if envelope.is_error == Some(true) {
        return Err(BackendError::Rejected(
            envelope
                .result
                .unwrap_or_else(|| "Claude returned an error".to_string()),
        ));
    }

    match envelope.result {
        Some(inner) if !inner.trim().is_empty() => Ok(inner),
        _ => Err(BackendError::EmptyResponse),
    }
}

/// Extract the error message from a failed run's envelope, if any.
fn envelope_error(stdout: &str) -> Option<String> {
    let envelope: ClaudeEnvelope = serde_json::from_str(stdout.trim()).ok()?;

    if envelope.is_error == Some(true) {
        envelope
            .result
            .or_else(|| Some("Claude returned an error".to_string()))
    } else {
        envelope.result.filter(|r| !r.is_empty())
    }
}
