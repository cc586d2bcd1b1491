//! Configuration management for chatlens
//!
//! Precedence is CLI flag, then `~/.config/chatlens/config.toml`, then the
//! built-in defaults.

mod analysis;
mod io;
mod types;

pub use analysis::*;
pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};

impl Config {
    /// Get the config file path (~/.config/chatlens/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Get the config directory path (~/.config/chatlens)
    pub fn config_dir() -> Result<PathBuf> {
        io::config_dir()
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        io::load()
    }

    /// Load configuration from `path`, or return defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        io::load_from(path)
    }

    /// Extra CLI arguments configured for `agent`.
    pub fn agent_extra_args(&self, agent: &str) -> Vec<String> {
        self.agents
            .agent_config(agent)
            .map(|c| c.extra_args.clone())
            .unwrap_or_default()
    }
}
