//! Time-gap segmentation of a message stream into sessions.
//!
//! A session grows while each new message arrives within `time_threshold`
//! seconds of the *last* message already in it. The threshold is inclusive:
//! a gap exactly equal to it still merges.
//!
//! The input must already be ordered by timestamp; nothing here sorts.

use super::types::{Message, Session};

/// Default gap (seconds) that closes a session: 30 minutes.
pub const DEFAULT_TIME_THRESHOLD_SECS: u64 = 1800;

/// Splits ordered messages into sessions by inter-message gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    time_threshold_secs: u64,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_THRESHOLD_SECS)
    }
}

impl Segmenter {
    pub fn new(time_threshold_secs: u64) -> Self {
        Self {
            time_threshold_secs,
        }
    }

    pub fn time_threshold_secs(&self) -> u64 {
        self.time_threshold_secs
    }

    /// Lazily iterate the sessions of `messages`.
    ///
    /// The iterator is `Clone`, so a run can be restarted from the beginning
    /// without re-reading the transcript.
    pub fn segment<'a>(&self, messages: &'a [Message]) -> Sessions<'a> {
        Sessions {
            messages,
            position: 0,
            threshold: self.threshold_i64(),
        }
    }

    /// Number of sessions `messages` splits into, without building them.
    pub fn count(&self, messages: &[Message]) -> usize {
        if messages.is_empty() {
            return 0;
        }
        let threshold = self.threshold_i64();
        1 + messages
            .windows(2)
            .filter(|pair| gap_secs(&pair[0], &pair[1]) > threshold)
            .count()
    }

    fn threshold_i64(&self) -> i64 {
        i64::try_from(self.time_threshold_secs).unwrap_or(i64::MAX)
    }
}

/// Seconds between two messages (negative if `next` is earlier).
fn gap_secs(previous: &Message, next: &Message) -> i64 {
    (next.timestamp - previous.timestamp).num_seconds()
}

/// Iterator over the sessions of a message slice.
#[derive(Debug, Clone)]
pub struct Sessions<'a> {
    messages: &'a [Message],
    position: usize,
    threshold: i64,
}

impl Iterator for Sessions<'_> {
    type Item = Session;

    fn next(&mut self) -> Option<Session> {
        let rest = &self.messages[self.position..];
        if rest.is_empty() {
            return None;
        }

        let mut end = 1;
        while end < rest.len() && gap_secs(&rest[end - 1], &rest[end]) <= self.threshold {
            end += 1;
        }

        self.position += end;
        Session::new(rest[..end].to_vec())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.messages.len() - self.position;
        (usize::from(remaining > 0), Some(remaining))
    }
}

impl std::iter::FusedIterator for Sessions<'_> {}
