//! Codex backend implementation.
//!
//! Invokes the Codex CLI with `exec --sandbox read-only`. With stdout piped,
//! codex writes the answer to stdout and status/thinking to stderr.

use super::{cli_failure, run_cli, BackendError, BackendResult, ClassifierBackend, ClassifyRequest};
use std::process::Command;
use std::time::Duration;

/// Backend for Codex CLI.
#[derive(Debug, Clone, Default)]
pub struct CodexBackend {
    /// Extra CLI arguments to pass to the codex command.
    extra_args: Vec<String>,
}

impl CodexBackend {
    pub fn new() -> Self {
        Self {
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    fn command() -> &'static str {
        "codex"
    }
}

impl ClassifierBackend for CodexBackend {
    fn name(&self) -> &'static str {
        "Codex"
    }

    fn is_available(&self) -> bool {
        super::command_exists(Self::command())
    }

    fn invoke(&self, request: &ClassifyRequest, timeout: Duration) -> BackendResult<String> {
        if !self.is_available() {
            return Err(BackendError::NotAvailable(
                "codex CLI not found in PATH".to_string(),
            ));
        }

        // Run in the temp dir so no project context is loaded.
        let mut cmd = Command::new(Self::command());
        cmd.arg("exec")
            .arg("--cd")
            .arg(std::env::temp_dir())
            .arg("--skip-git-repo-check");

        for arg in &self.extra_args {
            cmd.arg(arg);
        }

        // Sandbox must come last so extra_args cannot override it
        cmd.args(["--sandbox", "read-only"]);

        let output = run_cli(cmd, &request.combined(), timeout)?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() || !stdout.trim().is_empty() {
            Ok(stdout)
        } else {
            Err(cli_failure(&output, None))
        }
    }
}
