//! OpenAI-compatible HTTP backend.
//!
//! Posts to `<base_url>/chat/completions` and returns
//! `choices[0].message.content`. Works with any service that speaks this
//! API shape (OpenAI, Zhipu, local gateways).

use super::{
    parse_rate_limit_info, BackendError, BackendResult, ClassifierBackend, ClassifyRequest,
    RateLimitInfo,
};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_MODEL: &str = "glm-4-flash";
pub const DEFAULT_API_KEY_ENV: &str = "ZHIPUAI_API_KEY";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Backend for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    settings: HttpSettings,
}

impl HttpBackend {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    fn body(&self, request: &ClassifyRequest) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ]
        })
    }
}

impl ClassifierBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    fn invoke(&self, request: &ClassifyRequest, timeout: Duration) -> BackendResult<String> {
        let api_key = self.api_key().ok_or_else(|| {
            BackendError::NotAvailable(format!(
                "environment variable {} is not set",
                self.settings.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let url = self.endpoint();
        debug!(url = %url, model = %self.settings.model, "sending classification request");

        let response = client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(timeout)
                } else {
                    BackendError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(timeout)
            } else {
                BackendError::Http(e.to_string())
            }
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let mut info = parse_rate_limit_info(&text).unwrap_or_else(|| RateLimitInfo {
                retry_after: None,
                message: "Too many requests".to_string(),
            });
            info.retry_after = retry_after.or(info.retry_after);
            return Err(BackendError::RateLimited(info));
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                code: status.as_u16(),
                body: text,
            });
        }

        extract_content(&text)
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_content(body: &str) -> BackendResult<String> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| BackendError::Http(format!("invalid response body: {}", e)))?;

    match parsed["choices"][0]["message"]["content"].as_str() {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => Err(BackendError::EmptyResponse),
    }
}
