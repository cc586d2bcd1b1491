//! Parser for exported chat transcripts.
//!
//! Each message starts with a header line holding a timestamp and the
//! sender's display name, followed by any number of content lines:
//!
//! ```text
//! 2023-04-01 08:00:00 Alice
//! good morning
//! 2023-04-01 08:00:41 Bob
//! morning!
//! how did it go yesterday?
//! ```
//!
//! Content runs until the next header line and is trimmed. Lines before the
//! first header are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::analyzer::types::{Message, TIMESTAMP_FORMAT};

/// Length of a `YYYY-MM-DD HH:MM:SS` timestamp.
const TIMESTAMP_LEN: usize = 19;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Failed to read transcript {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse a transcript file.
pub fn parse_file(path: &Path, user_name: &str) -> Result<Vec<Message>, TranscriptError> {
    let text = fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let messages = parse_transcript(&text, user_name);
    debug!(path = %path.display(), messages = messages.len(), "parsed transcript");
    Ok(messages)
}

/// Parse transcript text into messages ordered by timestamp.
///
/// A message is the user's when its sender equals `user_name` exactly.
/// Messages sharing a timestamp keep their order in the file.
pub fn parse_transcript(text: &str, user_name: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut current: Option<(NaiveDateTime, &str, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some((timestamp, sender)) = parse_header(line) {
            if let Some(done) = current.take() {
                messages.push(finish(done, user_name));
            }
            current = Some((timestamp, sender, Vec::new()));
        } else if let Some((_, _, content)) = current.as_mut() {
            content.push(line);
        }
    }
    if let Some(done) = current {
        messages.push(finish(done, user_name));
    }

    // Stable, so equal timestamps keep file order
    messages.sort_by_key(|m| m.timestamp);
    messages
}

fn finish(
    (timestamp, sender, content): (NaiveDateTime, &str, Vec<&str>),
    user_name: &str,
) -> Message {
    let content = content.join("\n");
    Message::new(timestamp, sender, content.trim(), sender == user_name)
}

/// Split a header line into its timestamp and sender.
fn parse_header(line: &str) -> Option<(NaiveDateTime, &str)> {
    let stamp = line.get(..TIMESTAMP_LEN)?;
    let rest = &line[TIMESTAMP_LEN..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let sender = rest.trim();
    if sender.is_empty() {
        return None;
    }
    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((timestamp, sender))
}
