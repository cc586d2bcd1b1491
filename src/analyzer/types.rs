//! Data structures shared by the analysis pipeline.
//!
//! - [`Message`] - one parsed chat message
//! - [`Session`] - a contiguous run of messages produced by the segmenter
//! - [`ClassificationResult`] - validated, clamped classifier output
//! - [`AnalyzedSession`] - a session paired with its classification
//!
//! Timestamps are persisted as `YYYY-MM-DD HH:MM:SS` so checkpoints stay
//! human-readable and round-trip to the same `NaiveDateTime`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Timestamp format used in transcripts, prompts and persisted files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lowest allowed score for `importance` and `depth`.
pub const MIN_SCORE: u8 = 1;

/// Highest allowed score for `importance` and `depth`.
pub const MAX_SCORE: u8 = 10;

/// Score used when the classifier omits or garbles a numeric field.
pub const DEFAULT_SCORE: u8 = 5;

pub const DEFAULT_TOPIC: &str = "unknown";
pub const DEFAULT_REASON: &str = "none";
pub const DEFAULT_ATTITUDES: &str = "neutral";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub content: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub is_user: bool,
}

impl Message {
    pub fn new(
        timestamp: NaiveDateTime,
        sender: impl Into<String>,
        content: impl Into<String>,
        is_user: bool,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
            is_user,
        }
    }

    /// Timestamp rendered in [`TIMESTAMP_FORMAT`].
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// An ordered, non-empty run of messages with no gap above the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct Session {
    messages: Vec<Message>,
}

impl TryFrom<Vec<Message>> for Session {
    type Error = &'static str;

    fn try_from(messages: Vec<Message>) -> Result<Self, Self::Error> {
        Session::new(messages).ok_or("a session must contain at least one message")
    }
}

impl From<Session> for Vec<Message> {
    fn from(session: Session) -> Self {
        session.messages
    }
}

impl Session {
    /// Build a session from messages.
    ///
    /// Returns `None` for an empty list; sessions are never empty.
    pub fn new(messages: Vec<Message>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self { messages })
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// First message of the session (the party that opened it).
    pub fn first(&self) -> &Message {
        &self.messages[0]
    }

    /// Last message of the session.
    pub fn last(&self) -> &Message {
        &self.messages[self.messages.len() - 1]
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Validated classifier output for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub topic: String,
    pub is_new_topic: bool,
    pub new_topic_reason: String,
    pub importance: u8,
    pub attitudes: String,
    pub depth: u8,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            is_new_topic: false,
            new_topic_reason: DEFAULT_REASON.to_string(),
            importance: DEFAULT_SCORE,
            attitudes: DEFAULT_ATTITUDES.to_string(),
            depth: DEFAULT_SCORE,
        }
    }
}

impl ClassificationResult {
    /// The neutral result used when the service never produced a usable answer.
    ///
    /// `reason` ends up in `new_topic_reason` so the failure stays visible in
    /// checkpoints and reports.
    pub fn fallback(reason: impl std::fmt::Display) -> Self {
        Self {
            new_topic_reason: format!("analysis failed: {}", reason),
            ..Self::default()
        }
    }

    /// Coerce a parsed JSON object into a fully populated result.
    ///
    /// Missing or unusable fields take their defaults and scores are clamped
    /// to `[1, 10]`. This never fails.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            topic: text_field(fields.get("topic"), DEFAULT_TOPIC),
            is_new_topic: bool_field(fields.get("is_new_topic")),
            new_topic_reason: text_field(fields.get("new_topic_reason"), DEFAULT_REASON),
            importance: score_field(fields.get("importance")),
            attitudes: text_field(fields.get("attitudes"), DEFAULT_ATTITUDES),
            depth: score_field(fields.get("depth")),
        }
    }
}

fn text_field(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn bool_field(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

fn score_field(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok().or_else(|| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        }),
        _ => None,
    };

    match raw {
        Some(v) => clamp_score(v),
        None => DEFAULT_SCORE,
    }
}

/// Clamp an arbitrary integer into the `[1, 10]` score range.
pub fn clamp_score(value: i64) -> u8 {
    value.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as u8
}

/// A session together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedSession {
    #[serde(rename = "messages")]
    pub session: Session,
    #[serde(rename = "analysis")]
    pub result: ClassificationResult,
}

impl AnalyzedSession {
    pub fn new(session: Session, result: ClassificationResult) -> Self {
        Self { session, result }
    }

    /// Whether the user (rather than the partner) opened this session.
    pub fn opened_by_user(&self) -> bool {
        self.session.first().is_user
    }
}

/// Serde adapter for `YYYY-MM-DD HH:MM:SS` timestamps.
pub mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}
