//! Checkpoint file format and recovery

use std::fs;

use chatlens::analyzer::{CheckpointStore, JsonCheckpointStore, CHECKPOINT_FILE_NAME};
use chatlens::{AnalyzedSession, ClassificationResult, Session};
use chatlens::transcript::parse_transcript;
use tempfile::TempDir;

use crate::helpers::SAMPLE_CHAT;

fn analyzed_sample() -> Vec<AnalyzedSession> {
    let messages = parse_transcript(SAMPLE_CHAT, "Alice");
    vec![
        AnalyzedSession::new(
            Session::new(messages[..4].to_vec()).unwrap(),
            ClassificationResult {
                topic: "travel".to_string(),
                is_new_topic: true,
                importance: 6,
                ..ClassificationResult::default()
            },
        ),
        AnalyzedSession::new(
            Session::new(messages[4..6].to_vec()).unwrap(),
            ClassificationResult::fallback("timed out"),
        ),
    ]
}

#[test]
fn saved_file_uses_documented_layout() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path().join("out"));
    store.save(&analyzed_sample()).unwrap();

    let path = dir.path().join("out").join(CHECKPOINT_FILE_NAME);
    let raw = fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let first = &json["analyzed_sessions"][0];
    assert_eq!(first["messages"][0]["sender"], "Alice");
    assert_eq!(first["messages"][0]["timestamp"], "2023-04-01 08:00:00");
    assert_eq!(first["messages"][0]["is_user"], true);
    assert_eq!(first["messages"][3]["content"], "definitely\nlet's plan it this weekend");
    assert_eq!(first["analysis"]["topic"], "travel");
    assert_eq!(first["analysis"]["importance"], 6);
    assert!(json["saved_at"].as_str().unwrap().len() == 19);
    assert!(!store.temp_path().exists());
}

#[test]
fn save_then_load_returns_same_sessions() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());
    let sample = analyzed_sample();

    store.save(&sample).unwrap();
    assert_eq!(store.load(), sample);

    // Later saves replace the earlier content
    store.save(&sample[..1]).unwrap();
    assert_eq!(store.load(), sample[..1].to_vec());
}

#[test]
fn legacy_field_names_are_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CHECKPOINT_FILE_NAME);
    fs::write(
        &path,
        r#"{
  "analyzed_groups": [
    {
      "messages": [
        {"sender": "Alice", "content": "hi", "timestamp": "2023-04-01 08:00:00", "is_user": true}
      ],
      "analysis": {
        "topic": "greeting",
        "is_new_topic": true,
        "new_topic_reason": "opening",
        "importance": 2,
        "attitudes": "warm",
        "depth": 1
      }
    }
  ],
  "timestamp": "2023-04-01 09:00:00"
}"#,
    )
    .unwrap();

    let store = JsonCheckpointStore::at_path(&path);
    let loaded = store.load();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].result.topic, "greeting");
    assert!(loaded[0].opened_by_user());
}

#[test]
fn unreadable_checkpoint_loads_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());

    fs::write(store.path(), "{ truncated").unwrap();
    assert!(store.read().is_err());
    assert!(store.load().is_empty());

    // A session without messages is rejected as a whole
    fs::write(
        store.path(),
        r#"{"analyzed_sessions": [{"messages": [], "analysis": {}}],
            "saved_at": "2023-04-01 09:00:00"}"#,
    )
    .unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn missing_checkpoint_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::in_dir(dir.path());

    assert!(store.read().unwrap().is_none());
    assert!(store.load().is_empty());
    assert!(!store.clear().unwrap());

    store.save(&analyzed_sample()).unwrap();
    assert!(store.clear().unwrap());
    assert!(!store.exists());
}
