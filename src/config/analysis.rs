//! Analysis configuration for the `analyze` command.
//!
//! All fields are optional so users only need to specify what they want
//! to override. CLI flags take priority over config, which overrides defaults.

use serde::{Deserialize, Serialize};

use crate::analyzer::backend::AgentType;

/// `[analysis]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Classification backend ("claude", "codex", "gemini", "http")
    #[serde(default = "default_analysis_agent")]
    pub agent: Option<String>,
    /// Gap in seconds that starts a new session
    #[serde(default = "default_time_threshold")]
    pub time_threshold: Option<u64>,
    /// Attempts per session before the fallback result is used
    #[serde(default = "default_max_retries")]
    pub max_retries: Option<u32>,
    /// Seconds to wait between attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Option<u64>,
    /// Sessions between checkpoint writes
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: Option<usize>,
    /// Minimum importance (1-10) of a key discussion
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: Option<u8>,
    /// Timeout per service call in seconds
    #[serde(default = "default_analysis_timeout")]
    pub timeout: Option<u64>,
    /// Directory for checkpoints and results
    #[serde(default = "default_output_dir")]
    pub output_dir: Option<String>,
}

pub fn default_analysis_agent() -> Option<String> {
    Some("http".to_string())
}

pub fn default_time_threshold() -> Option<u64> {
    Some(1800)
}

pub fn default_max_retries() -> Option<u32> {
    Some(3)
}

pub fn default_retry_delay() -> Option<u64> {
    Some(5)
}

pub fn default_checkpoint_interval() -> Option<usize> {
    Some(10)
}

pub fn default_importance_threshold() -> Option<u8> {
    Some(7)
}

pub fn default_analysis_timeout() -> Option<u64> {
    Some(30)
}

pub fn default_output_dir() -> Option<String> {
    Some("analysis_results".to_string())
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            agent: default_analysis_agent(),
            time_threshold: default_time_threshold(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            checkpoint_interval: default_checkpoint_interval(),
            importance_threshold: default_importance_threshold(),
            timeout: default_analysis_timeout(),
            output_dir: default_output_dir(),
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration values.
    ///
    /// Returns `Ok(())` if all values are within acceptable bounds,
    /// or an error describing the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref agent) = self.agent {
            if AgentType::parse(agent).is_none() {
                return Err(format!(
                    "Unknown agent '{}'. Valid: {}",
                    agent,
                    AgentType::SUPPORTED
                ));
            }
        }
        if let Some(0) = self.max_retries {
            return Err("analysis.max_retries must be > 0".to_string());
        }
        if let Some(r) = self.max_retries {
            if r > 20 {
                return Err(format!("analysis.max_retries {} exceeds maximum (20)", r));
            }
        }
        if let Some(d) = self.retry_delay {
            if d > 3600 {
                return Err(format!("analysis.retry_delay {} exceeds maximum (3600s)", d));
            }
        }
        if let Some(0) = self.checkpoint_interval {
            return Err("analysis.checkpoint_interval must be > 0".to_string());
        }
        if let Some(i) = self.importance_threshold {
            if !(1..=10).contains(&i) {
                return Err(format!(
                    "analysis.importance_threshold {} must be between 1 and 10",
                    i
                ));
            }
        }
        if let Some(0) = self.timeout {
            return Err("analysis.timeout must be > 0".to_string());
        }
        if let Some(t) = self.timeout {
            if t > 3600 {
                return Err(format!("analysis.timeout {} exceeds maximum (3600s)", t));
            }
        }
        if let Some(ref dir) = self.output_dir {
            if dir.trim().is_empty() {
                return Err("analysis.output_dir must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Per-agent CLI configuration.
///
/// ```toml
/// [agents.codex]
/// extra_args = ["--model", "gpt-5.1-codex-mini"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    /// Extra CLI arguments passed on every classification call
    #[serde(default)]
    pub extra_args: Vec<String>,
}
