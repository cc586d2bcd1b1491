//! Gemini backend implementation.
//!
//! Invokes the Gemini CLI with `--output-format json --approval-mode plan`.
//! The JSON output wraps the model text in a `response` field.

use super::{cli_failure, run_cli, BackendError, BackendResult, ClassifierBackend, ClassifyRequest};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;

/// Backend for Gemini CLI.
#[derive(Debug, Clone, Default)]
pub struct GeminiBackend {
    /// Extra CLI arguments to pass to the gemini command.
    extra_args: Vec<String>,
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self {
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    fn command() -> &'static str {
        "gemini"
    }
}

impl ClassifierBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn is_available(&self) -> bool {
        super::command_exists(Self::command())
    }

    fn invoke(&self, request: &ClassifyRequest, timeout: Duration) -> BackendResult<String> {
        if !self.is_available() {
            return Err(BackendError::NotAvailable(
                "gemini CLI not found in PATH".to_string(),
            ));
        }

        let mut cmd = Command::new(Self::command());
        cmd.args(["--output-format", "json"]);

        for arg in &self.extra_args {
            cmd.arg(arg);
        }

        // Read-only mode and prompt source must come last
        cmd.args(["--approval-mode", "plan", "--prompt", "-"]);

        let output = run_cli(cmd, &request.combined(), timeout)?;

        if output.status.success() {
            unwrap_response(&String::from_utf8_lossy(&output.stdout))
        } else {
            Err(cli_failure(&output, None))
        }
    }
}

/// Gemini CLI JSON output: `{"response": "...", "stats": {...}}`.
#[derive(Debug, Deserialize)]
struct GeminiOutput {
    response: Option<String>,
    error: Option<serde_json::Value>,
}

/// Return the model text from Gemini's JSON output.
///
/// Output without a `response` or `error` field is passed through.
fn unwrap_response(stdout: &str) -> BackendResult<String> {
    let trimmed = stdout.trim();
    let Ok(output) = serde_json::from_str::<GeminiOutput>(trimmed) else {
        return Ok(trimmed.to_string());
    };

    if let Some(error) = output.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(BackendError::Rejected(message));
    }

    match output.response {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(BackendError::EmptyResponse),
        None => Ok(trimmed.to_string()),
    }
}
