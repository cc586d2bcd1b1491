//! Test helper utilities

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime};

use chatlens::analyzer::types::TIMESTAMP_FORMAT;
use chatlens::Message;

/// Get the path to the fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture file's contents
pub fn load_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
}

/// Messages alternating between "me" and "them", `gaps[i]` seconds after
/// the previous one.
pub fn messages_with_gaps(gaps: &[i64]) -> Vec<Message> {
    let mut at = ts("2023-01-01 00:00:00");
    let mut messages = vec![Message::new(at, "me", "m0", true)];
    for (i, gap) in gaps.iter().enumerate() {
        at += Duration::seconds(*gap);
        let is_user = (i + 1) % 2 == 0;
        let sender = if is_user { "me" } else { "them" };
        messages.push(Message::new(at, sender, format!("m{}", i + 1), is_user));
    }
    messages
}
