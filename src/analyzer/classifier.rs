//! Remote classification of one session.
//!
//! Each attempt runs: build request (filtered transcript) -> invoke backend
//! -> anomaly screen -> JSON repair -> field normalisation. Any failure is
//! retried under the [`RetryPolicy`]; when attempts run out the session gets
//! the fallback result instead of an error.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use super::backend::{ClassifierBackend, ClassifyRequest};
use super::error::ClassifyError;
use super::filter::ContentFilter;
use super::pipeline::SessionClassifier;
use super::prompt::build_classify_request;
use super::repair::repair_json;
use super::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use super::types::{ClassificationResult, Session};

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Characters of an anomalous response kept for diagnostics.
const ANOMALY_PREVIEW_CHARS: usize = 80;

/// Outcome of classifying one session. Always carries a usable result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub result: ClassificationResult,
    /// Number of service calls made
    pub attempts: u32,
    /// Final error when the fallback result was used
    pub last_error: Option<String>,
}

impl Classified {
    pub fn is_fallback(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Classifier backed by a remote service.
pub struct RemoteClassifier {
    backend: Box<dyn ClassifierBackend>,
    filter: ContentFilter,
    policy: RetryPolicy,
    timeout: Duration,
    sleeper: Box<dyn Sleeper>,
}

impl RemoteClassifier {
    /// Create a classifier with the default filter, retry policy and timeout.
    pub fn new(backend: impl ClassifierBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            filter: ContentFilter::default(),
            policy: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Classify `session`, retrying and falling back as needed.
    pub fn classify(&self, session: &Session) -> Classified {
        let request = build_classify_request(session, &self.filter);

        let outcome = self.policy.run(
            self.sleeper.as_ref(),
            |attempt| {
                debug!(attempt, backend = self.backend.name(), "classifying session");
                self.attempt(&request)
            },
            |attempt, e| {
                warn!(
                    attempt,
                    max_attempts = self.policy.max_attempts(),
                    kind = e.kind(),
                    error = %e,
                    "classification attempt failed"
                );
            },
        );

        match outcome.result {
            Ok(result) => Classified {
                result,
                attempts: outcome.attempts,
                last_error: None,
            },
            Err(e) => Classified {
                result: ClassificationResult::fallback(&e),
                attempts: outcome.attempts,
                last_error: Some(e.to_string()),
            },
        }
    }

    /// One service call plus validation.
    fn attempt(&self, request: &ClassifyRequest) -> Result<ClassificationResult, ClassifyError> {
        let raw = self.backend.invoke(request, self.timeout)?;
        screen_anomaly(&raw)?;
        let fields = repair_json(&raw)?;
        Ok(ClassificationResult::from_fields(&fields))
    }
}

impl SessionClassifier for RemoteClassifier {
    fn classify(&self, session: &Session) -> Result<Classified, ClassifyError> {
        Ok(RemoteClassifier::classify(self, session))
    }
}

/// Reject empty output and output dominated by one repeated character.
///
/// A response is anomalous when a single non-whitespace character makes up
/// more than half of all its characters.
pub fn screen_anomaly(raw: &str) -> Result<(), ClassifyError> {
    if raw.trim().is_empty() {
        return Err(ClassifyError::Anomalous {
            preview: "<empty>".to_string(),
        });
    }

    let total = raw.chars().count();
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in raw.chars().filter(|c| !c.is_whitespace()) {
        *counts.entry(c).or_insert(0) += 1;
    }

    match counts.into_iter().max_by_key(|(_, n)| *n) {
        Some((_, n)) if n * 2 > total => Err(ClassifyError::Anomalous {
            preview: raw.chars().take(ANOMALY_PREVIEW_CHARS).collect(),
        }),
        _ => Ok(()),
    }
}
