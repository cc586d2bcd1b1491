//! Classification service backends.
//!
//! A backend turns one [`ClassifyRequest`] into the service's raw text
//! answer. It knows nothing about JSON repair or retries; those live in the
//! classifier.
//!
//! # Supported Backends
//!
//! - **Claude**: `claude --print --output-format json --tools "" -p -`
//! - **Codex**: `codex exec --sandbox read-only` (plain text on stdout)
//! - **Gemini**: `gemini --output-format json --approval-mode plan --prompt -`
//! - **Http**: any OpenAI-compatible `/chat/completions` endpoint
//!
//! # Design
//!
//! The `ClassifierBackend` trait is the seam tests stub out. Backends are
//! stateless and `Send + Sync`.

mod claude;
mod codex;
mod gemini;
pub mod http;

pub use claude::ClaudeBackend;
pub use codex::CodexBackend;
pub use gemini::GeminiBackend;
pub use http::{HttpBackend, HttpSettings};

use std::time::Duration;
use thiserror::Error;

/// One classification request: fixed instructions plus the session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest {
    /// Instructions the service must follow (output format, neutrality).
    pub system: String,
    /// The rendered session transcript.
    pub user: String,
}

impl ClassifyRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Single prompt for backends without a separate system channel.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system.trim_end(), self.user)
    }
}

/// Wait for child process with timeout.
///
/// Uses a simple polling approach since std::process doesn't have
/// native timeout support. Includes proper process reaping to prevent zombies.
pub(crate) fn wait_with_timeout(
    child: &mut std::process::Child,
    timeout: Duration,
) -> std::io::Result<std::process::Output> {
    use std::io::Read;
    use std::thread;
    use std::time::Instant;

    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = child
                    .stdout
                    .take()
                    .map(|mut s| {
                        let mut buf = Vec::new();
                        s.read_to_end(&mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();

                let stderr = child
                    .stderr
                    .take()
                    .map(|mut s| {
                        let mut buf = Vec::new();
                        s.read_to_end(&mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();

                return Ok(std::process::Output {
                    status,
                    stdout,
                    stderr,
                });
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    // Kill and reap to prevent zombie process
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "Process timed out",
                    ));
                }
                thread::sleep(poll_interval);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Spawn `cmd`, write `prompt` to its stdin and wait up to `timeout`.
///
/// Shared by the CLI backends. A non-zero exit is turned into
/// `RateLimited` when stderr says so, otherwise `ExitCode`.
pub(crate) fn run_cli(
    mut cmd: std::process::Command,
    prompt: &str,
    timeout: Duration,
) -> BackendResult<std::process::Output> {
    use std::io::Write;
    use std::process::Stdio;

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(prompt.as_bytes())?;
        // stdin is dropped here, closing the pipe
    }

    match wait_with_timeout(&mut child, timeout) {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(BackendError::Timeout(timeout)),
        Err(e) => Err(BackendError::Io(e)),
    }
}

/// Map a failed CLI run to the most specific error.
pub(crate) fn cli_failure(output: &std::process::Output, detail: Option<String>) -> BackendError {
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if let Some(info) = parse_rate_limit_info(&stderr) {
        return BackendError::RateLimited(info);
    }

    BackendError::ExitCode {
        code: output.status.code().unwrap_or(-1),
        stderr: detail.unwrap_or(stderr),
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Transport to a classification service (Strategy pattern).
pub trait ClassifierBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Whether the backend can be used right now (CLI on PATH, API key set).
    fn is_available(&self) -> bool;

    /// Send one request and return the service's raw text answer.
    ///
    /// The call must return within roughly `timeout`.
    fn invoke(&self, request: &ClassifyRequest, timeout: Duration) -> BackendResult<String>;
}

impl<B: ClassifierBackend + ?Sized> ClassifierBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn invoke(&self, request: &ClassifyRequest, timeout: Duration) -> BackendResult<String> {
        (**self).invoke(request, timeout)
    }
}

/// Backend kinds selectable from config or the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    Claude,
    Codex,
    Gemini,
    Http,
}

impl AgentType {
    /// Names accepted by [`AgentType::parse`], for help and error text.
    pub const SUPPORTED: &'static str = "claude, codex, gemini, http";

    /// Parse a backend name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "claude" => Some(AgentType::Claude),
            "codex" => Some(AgentType::Codex),
            "gemini" | "gemini-cli" => Some(AgentType::Gemini),
            "http" | "openai" | "api" => Some(AgentType::Http),
            _ => None,
        }
    }

    /// Create the backend for this type.
    ///
    /// `http` is only used by [`AgentType::Http`], `extra_args` only by the
    /// CLI backends.
    pub fn create_backend(
        &self,
        http: HttpSettings,
        extra_args: Vec<String>,
    ) -> Box<dyn ClassifierBackend> {
        match self {
            AgentType::Claude => Box::new(ClaudeBackend::with_extra_args(extra_args)),
            AgentType::Codex => Box::new(CodexBackend::with_extra_args(extra_args)),
            AgentType::Gemini => Box::new(GeminiBackend::with_extra_args(extra_args)),
            AgentType::Http => Box::new(HttpBackend::new(http)),
        }
    }

    /// Config/CLI name of this backend.
    pub fn command_name(&self) -> &'static str {
        match self {
            AgentType::Claude => "claude",
            AgentType::Codex => "codex",
            AgentType::Gemini => "gemini",
            AgentType::Http => "http",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::Claude => write!(f, "Claude"),
            AgentType::Codex => write!(f, "Codex"),
            AgentType::Gemini => write!(f, "Gemini"),
            AgentType::Http => write!(f, "HTTP"),
        }
    }
}

/// Errors from classification backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not available: {0}")]
    NotAvailable(String),

    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Exit code {code}: {}", truncate_stderr(stderr))]
    ExitCode { code: i32, stderr: String },

    #[error("Rate limited: {0}")]
    RateLimited(RateLimitInfo),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {code}: {}", truncate_stderr(body))]
    Status { code: u16, body: String },

    #[error("Service returned an error: {}", truncate_stderr(.0))]
    Rejected(String),

    #[error("Service returned an empty response")]
    EmptyResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rate limit information extracted from a backend response.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// When the rate limit resets (if provided by the service)
    pub retry_after: Option<Duration>,
    /// Human-readable message
    pub message: String,
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(retry_after) = self.retry_after {
            write!(f, "{} (retry after {:?})", self.message, retry_after)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Parse rate limit info from backend stderr or an error body.
///
/// Each service signals rate limiting differently. This function
/// attempts to extract retry-after timing from various formats.
pub fn parse_rate_limit_info(stderr: &str) -> Option<RateLimitInfo> {
    let stderr_lower = stderr.to_lowercase();

    let is_rate_limited = stderr_lower.contains("rate limit")
        || stderr_lower.contains("throttled")
        || stderr_lower.contains("resource_exhausted")
        || stderr_lower.contains("429")
        || stderr_lower.contains("too many requests")
        || stderr_lower.contains("quota exceeded");

    if !is_rate_limited {
        return None;
    }

    let retry_after = extract_retry_seconds(&stderr_lower).map(Duration::from_secs);

    Some(RateLimitInfo {
        retry_after,
        message: stderr.lines().next().unwrap_or("Rate limited").to_string(),
    })
}

/// Extract retry delay from various formats.
fn extract_retry_seconds(stderr: &str) -> Option<u64> {
    let extract_after = |text: &str, keyword: &str| -> Option<u64> {
        text.find(keyword).and_then(|pos| {
            let after = &text[pos + keyword.len()..];
            extract_first_number(after)
        })
    };

    for keyword in ["retry after ", "retry_after", "retry in ", "retrydelay:", "wait "] {
        if let Some(secs) = extract_after(stderr, keyword) {
            return Some(secs);
        }
    }

    // "45 seconds remaining"
    if stderr.contains("seconds") {
        return extract_first_number(stderr);
    }

    None
}

/// Extract the first number from a string.
fn extract_first_number(s: &str) -> Option<u64> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().ok()
}

/// Truncate stderr for error display.
///
/// Takes the first line and limits to 200 characters for readability.
fn truncate_stderr(stderr: &str) -> String {
    let first_line = stderr.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= 200 {
        first_line.to_string()
    } else {
        let head: String = first_line.chars().take(200).collect();
        format!("{}...", head)
    }
}

/// Check if a command is available in PATH.
///
/// Uses platform-specific command lookup:
/// - Unix: `which` command
/// - Windows: `where` command
pub fn command_exists(command: &str) -> bool {
    #[cfg(windows)]
    let lookup_cmd = "where";
    #[cfg(not(windows))]
    let lookup_cmd = "which";

    std::process::Command::new(lookup_cmd)
        .arg(command)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
