//! Classifier contract: normalisation, repair, retry and fallback

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use chatlens::analyzer::backend::BackendResult;
use chatlens::analyzer::{
    repair_json, BackendError, ClassifierBackend, ClassifyRequest, RemoteClassifier, RetryPolicy,
};
use chatlens::{ClassificationResult, Message, Session};

use crate::helpers::ts;

/// Backend answering from a script; the last entry repeats.
struct ScriptedBackend {
    script: Vec<BackendResult<String>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedBackend {
    fn new(script: Vec<BackendResult<String>>) -> (Self, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        (
            Self {
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl ClassifierBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn invoke(&self, _request: &ClassifyRequest, _timeout: Duration) -> BackendResult<String> {
        let mut calls = self.calls.lock().unwrap();
        let index = (*calls).min(self.script.len() - 1);
        *calls += 1;
        match &self.script[index] {
            Ok(text) => Ok(text.clone()),
            Err(_) => Err(BackendError::EmptyResponse),
        }
    }
}

fn session() -> Session {
    Session::new(vec![
        Message::new(ts("2023-01-01 10:00:00"), "me", "shall we plan the trip?", true),
        Message::new(ts("2023-01-01 10:01:00"), "them", "yes", false),
    ])
    .unwrap()
}

fn classifier(
    script: Vec<BackendResult<String>>,
    attempts: u32,
) -> (RemoteClassifier, Arc<Mutex<usize>>, Arc<Mutex<Vec<Duration>>>) {
    let (backend, calls) = ScriptedBackend::new(script);
    let sleeps = Arc::new(Mutex::new(Vec::new()));
    let recorded = sleeps.clone();
    let classifier = RemoteClassifier::new(backend)
        .with_retry_policy(RetryPolicy::new(attempts, Duration::from_secs(5)))
        .with_sleeper(move |d: Duration| recorded.lock().unwrap().push(d));
    (classifier, calls, sleeps)
}

// ============================================
// Normalisation
// ============================================

#[test]
fn out_of_range_scores_are_clamped() {
    let (classifier, _, _) = classifier(
        vec![Ok(r#"{"topic":"trip","is_new_topic":true,"new_topic_reason":"plans",
                    "importance":15,"attitudes":"keen","depth":-3}"#
            .to_string())],
        3,
    );

    let classified = classifier.classify(&session());

    assert!(!classified.is_fallback());
    assert_eq!(classified.result.importance, 10);
    assert_eq!(classified.result.depth, 1);
    assert_eq!(classified.result.topic, "trip");
}

#[test]
fn non_numeric_depth_takes_default() {
    let (classifier, _, _) = classifier(
        vec![Ok(r#"{"topic":"trip","importance":"8","depth":"abc"}"#.to_string())],
        3,
    );

    let result = classifier.classify(&session()).result;

    assert_eq!(result.importance, 8);
    assert_eq!(result.depth, 5);
    assert_eq!(result.attitudes, "neutral");
}

// ============================================
// Repair
// ============================================

#[test]
fn repair_is_idempotent_on_its_own_output() {
    let inputs = [
        r#"{"topic":"a","importance":3,}"#,
        "Sure! ```json\n{\"topic\": \"b\", \"depth\": 2,,}\n``` hope this helps",
        r#"noise {"outer": {"topic": "c"}} trailing"#,
        r#"{"topic": "commas, inside", "list": [1, 2,]}"#,
    ];

    for raw in inputs {
        let once = repair_json(raw).unwrap();
        let again = repair_json(&Value::Object(once.clone()).to_string()).unwrap();
        assert_eq!(once, again, "input {raw}");
    }
}

// ============================================
// Retry and fallback
// ============================================

#[test]
fn exhausted_retries_give_fallback_after_exactly_max_attempts() {
    let (classifier, calls, sleeps) =
        classifier(vec![Ok("I cannot help with that.".to_string())], 3);

    let classified = classifier.classify(&session());

    assert!(classified.is_fallback());
    assert_eq!(classified.attempts, 3);
    assert_eq!(*calls.lock().unwrap(), 3);
    assert_eq!(
        *sleeps.lock().unwrap(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );
    assert_eq!(classified.result.topic, ClassificationResult::default().topic);
    assert!(classified.result.new_topic_reason.starts_with("analysis failed: "));
    assert!(classified.result.new_topic_reason.len() > "analysis failed: ".len());
}

#[test]
fn transport_errors_are_retried_until_success() {
    let (classifier, calls, sleeps) = classifier(
        vec![
            Err(BackendError::EmptyResponse),
            Ok(r#"{"topic":"trip"}"#.to_string()),
        ],
        3,
    );

    let classified = classifier.classify(&session());

    assert!(!classified.is_fallback());
    assert_eq!(classified.attempts, 2);
    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(sleeps.lock().unwrap().len(), 1);
}

#[test]
fn anomalous_response_is_rejected_before_parsing() {
    // 60 '!' out of 100 characters, with an otherwise parseable object
    let mut flood = "!".repeat(60);
    flood.push_str(r#"{"topic":"x"}"#);
    flood.push_str(&" ".repeat(100 - flood.chars().count()));
    assert_eq!(flood.chars().count(), 100);

    let (classifier, calls, _) =
        classifier(vec![Ok(flood), Ok(r#"{"topic":"real"}"#.to_string())], 3);

    let classified = classifier.classify(&session());

    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(classified.result.topic, "real");
}

#[test]
fn single_attempt_policy_never_sleeps() {
    let (classifier, calls, sleeps) = classifier(vec![Ok(String::new())], 1);

    let classified = classifier.classify(&session());

    assert!(classified.is_fallback());
    assert_eq!(*calls.lock().unwrap(), 1);
    assert!(sleeps.lock().unwrap().is_empty());
}
