//! End-to-end pipeline runs against a file-backed checkpoint

use std::sync::atomic::Ordering;
use std::time::Duration;

use chatlens::analyzer::{
    CancellationToken, CheckpointStore, DefaultProgressReporter, JsonCheckpointStore, Pipeline,
    PipelineError, PipelineOptions, PipelineState, RemoteClassifier, RetryPolicy,
};
use chatlens::transcript::parse_transcript;
use chatlens::Message;
use tempfile::TempDir;

use crate::helpers::{EchoBackend, SAMPLE_CHAT};

fn sample_messages() -> Vec<Message> {
    parse_transcript(SAMPLE_CHAT, "Alice")
}

fn classifier(backend: EchoBackend) -> RemoteClassifier {
    RemoteClassifier::new(backend)
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO))
        .with_sleeper(|_: Duration| {})
}

// ============================================================================
// Complete runs
// ============================================================================

#[test]
fn full_run_annotates_every_session_and_checkpoints() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let backend = EchoBackend::new();
    let calls = backend.call_counter();
    let classifier = classifier(backend);
    let progress = DefaultProgressReporter::quiet();
    let messages = sample_messages();

    let mut pipeline = Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress);
    let run = pipeline.run(&messages).unwrap();

    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(run.analyzed.len(), 4);
    assert_eq!(run.resumed, 0);
    assert_eq!(run.fallbacks, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let topics: Vec<&str> = run.analyzed.iter().map(|a| a.result.topic.as_str()).collect();
    assert_eq!(
        topics,
        vec![
            "good morning! did you see the trip photos?",
            "lunch?",
            "I got the job offer",
            "morning",
        ]
    );
    assert_eq!(run.result.topic_initiation.user, 2);
    assert_eq!(run.result.topic_initiation.partner, 0);

    // Final save covers the partial last interval
    let checkpoint = store.read().unwrap().unwrap();
    assert_eq!(checkpoint.analyzed_sessions, run.analyzed);
}

#[test]
fn rerun_after_completion_makes_no_calls() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let progress = DefaultProgressReporter::quiet();
    let messages = sample_messages();

    let first = {
        let classifier = classifier(EchoBackend::new());
        Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress)
            .run(&messages)
            .unwrap()
    };

    let backend = EchoBackend::new();
    let calls = backend.call_counter();
    let classifier = classifier(backend);
    let second = Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress)
        .run(&messages)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.resumed, 4);
    assert_eq!(second.analyzed, first.analyzed);
}

#[test]
fn unusable_answer_gets_fallback_and_run_continues() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let classifier = classifier(EchoBackend::new().with_garbage_on(&[2]));
    let progress = DefaultProgressReporter::quiet();

    let run = Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress)
        .run(&sample_messages())
        .unwrap();

    assert_eq!(run.analyzed.len(), 4);
    assert_eq!(run.fallbacks, 1);
    let fallback = &run.analyzed[1].result;
    assert_eq!(fallback.topic, "unknown");
    assert_eq!(fallback.importance, 5);
    assert_eq!(fallback.depth, 5);
    assert!(!fallback.is_new_topic);
    assert_eq!(run.analyzed[2].result.topic, "I got the job offer");

    // The fallback is persisted like any other result
    assert_eq!(store.load()[1].result, *fallback);
}

// ============================================================================
// Interruption and resume
// ============================================================================

#[test]
fn interrupted_run_resumes_to_identical_result() {
    let messages = sample_messages();
    let progress = DefaultProgressReporter::quiet();

    let reference_dir = TempDir::new().unwrap();
    let reference_store = JsonCheckpointStore::in_dir(reference_dir.path());
    let reference = {
        let classifier = classifier(EchoBackend::new());
        Pipeline::new(PipelineOptions::default(), &classifier, &reference_store, &progress)
            .run(&messages)
            .unwrap()
    };

    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());

    // Cancel while the second session is being classified
    let token = CancellationToken::new();
    let classifier_a = classifier(EchoBackend::cancelling_after(2, token.clone()));
    let mut interrupted =
        Pipeline::new(PipelineOptions::default(), &classifier_a, &store, &progress)
            .with_cancellation(token);
    let err = interrupted.run(&messages).unwrap_err();

    assert_eq!(interrupted.state(), PipelineState::Interrupted);
    match err {
        PipelineError::Cancelled {
            completed,
            total,
            checkpoint_saved,
        } => {
            assert_eq!(completed, 2);
            assert_eq!(total, 4);
            assert!(checkpoint_saved);
        }
    }
    assert_eq!(store.load().len(), 2);

    let backend = EchoBackend::new();
    let calls = backend.call_counter();
    let classifier_b = classifier(backend);
    let resumed = Pipeline::new(PipelineOptions::default(), &classifier_b, &store, &progress)
        .run(&messages)
        .unwrap();

    assert_eq!(resumed.resumed, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(resumed.analyzed, reference.analyzed);
    assert_eq!(resumed.result, reference.result);
}

#[test]
fn session_failing_during_cancellation_is_retried_on_resume() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let progress = DefaultProgressReporter::quiet();
    let messages = sample_messages();

    // The second call cancels, and it and its retries answer with prose
    let token = CancellationToken::new();
    let backend = EchoBackend::cancelling_after(2, token.clone()).with_garbage_on(&[2, 3]);
    let interrupted = RemoteClassifier::new(backend)
        .with_retry_policy(RetryPolicy::new(2, Duration::ZERO))
        .with_sleeper(|_: Duration| {});
    let err = Pipeline::new(PipelineOptions::default(), &interrupted, &store, &progress)
        .with_cancellation(token)
        .run(&messages)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled { completed: 1, .. }));
    let saved = store.load();
    assert_eq!(saved.len(), 1);
    assert!(!saved[0].result.new_topic_reason.starts_with("analysis failed"));

    let backend = EchoBackend::new();
    let calls = backend.call_counter();
    let resumed_classifier = classifier(backend);
    let resumed = Pipeline::new(PipelineOptions::default(), &resumed_classifier, &store, &progress)
        .run(&messages)
        .unwrap();

    assert_eq!(resumed.resumed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(resumed.fallbacks, 0);
    assert_eq!(resumed.analyzed[1].result.topic, "lunch?");
}

#[test]
fn checkpoint_from_other_transcript_is_discarded() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let progress = DefaultProgressReporter::quiet();

    let other = parse_transcript(
        "2022-01-01 10:00:00 Carol\nhello\n2022-01-01 10:01:00 Dave\nhi\n",
        "Carol",
    );
    {
        let classifier = classifier(EchoBackend::new());
        Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress)
            .run(&other)
            .unwrap();
    }

    let backend = EchoBackend::new();
    let calls = backend.call_counter();
    let classifier = classifier(backend);
    let run = Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress)
        .run(&sample_messages())
        .unwrap();

    assert_eq!(run.resumed, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(store.load().len(), 4);
}

#[test]
fn threshold_change_invalidates_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let progress = DefaultProgressReporter::quiet();
    let messages = sample_messages();

    {
        let classifier = classifier(EchoBackend::new());
        Pipeline::new(PipelineOptions::default(), &classifier, &store, &progress)
            .run(&messages)
            .unwrap();
    }

    // A one-day threshold merges everything before the final gap
    let classifier = classifier(EchoBackend::new());
    let run = Pipeline::new(
        PipelineOptions::default().time_threshold(86_400),
        &classifier,
        &store,
        &progress,
    )
    .run(&messages)
    .unwrap();

    assert_eq!(run.resumed, 0);
    assert!(run.analyzed.len() < 4);
    assert_eq!(
        run.analyzed.iter().map(|a| a.session.len()).sum::<usize>(),
        messages.len()
    );
}
