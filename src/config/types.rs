//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::analysis::{AgentConfig, AnalysisConfig};
use crate::analyzer::backend::http::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use crate::analyzer::backend::HttpSettings;
use crate::analyzer::filter::{ContentFilter, RedactionPolicy, DEFAULT_MARKER, DEFAULT_TERMS};
use crate::analyzer::moments::{
    owned, MomentDetector, MomentTerms, DEFAULT_ATTITUDE_WINDOW_DAYS, DEFAULT_ENDEARMENTS,
    DEFAULT_INTIMATE_TERMS, DEFAULT_LITERATURE_TERMS, DEFAULT_MOVIE_TERMS, DEFAULT_SOCIAL_TERMS,
    DEFAULT_TV_TERMS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub moments: MomentsConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl Config {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.analysis.validate()?;
        self.http.validate()?;
        self.filter.validate()?;
        self.moments.validate()
    }
}

/// HTTP backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

pub fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

pub fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

pub fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "http.base_url '{}' must start with http:// or https://",
                self.base_url
            ));
        }
        if self.api_key_env.trim().is_empty() {
            return Err("http.api_key_env must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "http.temperature {} must be between 0.0 and 2.0",
                self.temperature
            ));
        }
        Ok(())
    }

    pub fn to_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key_env: self.api_key_env.clone(),
            temperature: self.temperature,
        }
    }
}

/// Content filter configuration
///
/// ```toml
/// [filter]
/// marker = "**"
///
/// [filter.terms]
/// gambling = "mask"
/// "credit card" = "remove"
/// violence = { replace = "[conflict]" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,
    /// Replacement text for masked terms
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_terms")]
    pub terms: BTreeMap<String, RedactionPolicy>,
}

pub fn default_filter_enabled() -> bool {
    true
}

pub fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

pub fn default_terms() -> BTreeMap<String, RedactionPolicy> {
    DEFAULT_TERMS
        .iter()
        .map(|term| (term.to_string(), RedactionPolicy::Mask))
        .collect()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_filter_enabled(),
            marker: default_marker(),
            terms: default_terms(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.terms.keys().any(|term| term.trim().is_empty()) {
            return Err("filter.terms must not contain empty terms".to_string());
        }
        Ok(())
    }

    /// Build the filter; a disabled section yields a pass-through filter.
    pub fn to_filter(&self) -> ContentFilter {
        if self.enabled {
            ContentFilter::new(self.marker.clone(), self.terms.clone())
        } else {
            ContentFilter::disabled()
        }
    }
}

/// Key moment term tables and comparison window
///
/// ```toml
/// [moments]
/// window_days = 14
/// endearments = ["honey", "pumpkin"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentsConfig {
    /// Days compared on each side of a key date
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_endearments")]
    pub endearments: Vec<String>,
    #[serde(default = "default_intimate_terms")]
    pub intimate: Vec<String>,
    #[serde(default = "default_literature_terms")]
    pub literature: Vec<String>,
    #[serde(default = "default_movie_terms")]
    pub movies: Vec<String>,
    #[serde(default = "default_tv_terms")]
    pub tv_shows: Vec<String>,
    #[serde(default = "default_social_terms")]
    pub social_topics: Vec<String>,
}

pub fn default_window_days() -> u32 {
    DEFAULT_ATTITUDE_WINDOW_DAYS
}

pub fn default_endearments() -> Vec<String> {
    owned(DEFAULT_ENDEARMENTS)
}

pub fn default_intimate_terms() -> Vec<String> {
    owned(DEFAULT_INTIMATE_TERMS)
}

pub fn default_literature_terms() -> Vec<String> {
    owned(DEFAULT_LITERATURE_TERMS)
}

pub fn default_movie_terms() -> Vec<String> {
    owned(DEFAULT_MOVIE_TERMS)
}

pub fn default_tv_terms() -> Vec<String> {
    owned(DEFAULT_TV_TERMS)
}

pub fn default_social_terms() -> Vec<String> {
    owned(DEFAULT_SOCIAL_TERMS)
}

impl Default for MomentsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            endearments: default_endearments(),
            intimate: default_intimate_terms(),
            literature: default_literature_terms(),
            movies: default_movie_terms(),
            tv_shows: default_tv_terms(),
            social_topics: default_social_terms(),
        }
    }
}

impl MomentsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=365).contains(&self.window_days) {
            return Err(format!(
                "moments.window_days {} must be between 1 and 365",
                self.window_days
            ));
        }
        Ok(())
    }

    pub fn to_detector(&self) -> MomentDetector {
        MomentDetector::new(MomentTerms {
            endearments: self.endearments.clone(),
            intimate: self.intimate.clone(),
            literature: self.literature.clone(),
            movies: self.movies.clone(),
            tv_shows: self.tv_shows.clone(),
            social_topics: self.social_topics.clone(),
        })
    }
}

/// Per-agent CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub claude: AgentConfig,
    #[serde(default)]
    pub codex: AgentConfig,
    #[serde(default)]
    pub gemini: AgentConfig,
}

impl AgentsConfig {
    /// Look up per-agent configuration by name.
    pub fn agent_config(&self, name: &str) -> Option<&AgentConfig> {
        match name {
            "claude" => Some(&self.claude),
            "codex" => Some(&self.codex),
            "gemini" => Some(&self.gemini),
            _ => None,
        }
    }
}
