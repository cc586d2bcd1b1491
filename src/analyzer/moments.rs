//! Key moments of a relationship as seen in its chat history.
//!
//! Two independent views:
//! - landmark topics: the first use of each term of endearment, and every
//!   message touching an intimate or cultural subject, found with plain
//!   term tables ([`MomentTerms`])
//! - key dates read from a JSON file ([`KeyDates`]); for each date the days
//!   before are compared with the days after ([`KeyMoment`])
//!
//! Both work on the parsed transcript; the key-date comparison also uses the
//! classifier's per-session annotations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{timestamp_format, AnalyzedSession, Message};

/// Days on each side of a key date that are compared.
pub const DEFAULT_ATTITUDE_WINDOW_DAYS: u32 = 7;

pub const DEFAULT_ENDEARMENTS: &[&str] = &[
    "宝贝", "宝宝", "亲爱的", "老公", "老婆", "babe", "honey", "darling", "sweetheart",
];
pub const DEFAULT_INTIMATE_TERMS: &[&str] =
    &["性", "爱", "亲密", "身体", "关系", "intimacy"];
pub const DEFAULT_LITERATURE_TERMS: &[&str] = &["作者", "作家", "novel", "author"];
pub const DEFAULT_MOVIE_TERMS: &[&str] = &["电影", "导演", "演员", "movie", "director"];
pub const DEFAULT_TV_TERMS: &[&str] = &["电视剧", "tv show", "tv series"];
pub const DEFAULT_SOCIAL_TERMS: &[&str] = &["新闻", "社会", "政治", "news", "politics"];

/// Which side of the conversation sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    User,
    Partner,
}

impl Party {
    pub fn of(message: &Message) -> Self {
        if message.is_user {
            Party::User
        } else {
            Party::Partner
        }
    }
}

/// Cultural subjects, in matching priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CultureCategory {
    Literature,
    Movies,
    TvShows,
    SocialTopics,
}

/// Term tables used to spot landmark topics. Matching is case-insensitive
/// substring search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MomentTerms {
    pub endearments: Vec<String>,
    pub intimate: Vec<String>,
    pub literature: Vec<String>,
    pub movies: Vec<String>,
    pub tv_shows: Vec<String>,
    pub social_topics: Vec<String>,
}

impl Default for MomentTerms {
    fn default() -> Self {
        Self {
            endearments: owned(DEFAULT_ENDEARMENTS),
            intimate: owned(DEFAULT_INTIMATE_TERMS),
            literature: owned(DEFAULT_LITERATURE_TERMS),
            movies: owned(DEFAULT_MOVIE_TERMS),
            tv_shows: owned(DEFAULT_TV_TERMS),
            social_topics: owned(DEFAULT_SOCIAL_TERMS),
        }
    }
}

pub fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

/// First use of a term of endearment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndearmentUse {
    pub term: String,
    #[serde(with = "timestamp_format")]
    pub first_occurrence: NaiveDateTime,
    pub sender: Party,
}

/// A message that touched a landmark subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMention {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub sender: Party,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LandmarkTopics {
    pub terms_of_endearment: Vec<EndearmentUse>,
    pub intimate_topics: Vec<TopicMention>,
    pub literature: Vec<TopicMention>,
    pub movies: Vec<TopicMention>,
    pub tv_shows: Vec<TopicMention>,
    pub social_topics: Vec<TopicMention>,
}

impl LandmarkTopics {
    pub fn mentions(&self, category: CultureCategory) -> &[TopicMention] {
        match category {
            CultureCategory::Literature => &self.literature,
            CultureCategory::Movies => &self.movies,
            CultureCategory::TvShows => &self.tv_shows,
            CultureCategory::SocialTopics => &self.social_topics,
        }
    }

    fn mentions_mut(&mut self, category: CultureCategory) -> &mut Vec<TopicMention> {
        match category {
            CultureCategory::Literature => &mut self.literature,
            CultureCategory::Movies => &mut self.movies,
            CultureCategory::TvShows => &mut self.tv_shows,
            CultureCategory::SocialTopics => &mut self.social_topics,
        }
    }
}

/// Scans messages for landmark topics.
#[derive(Debug, Clone)]
pub struct MomentDetector {
    terms: MomentTerms,
}

impl Default for MomentDetector {
    fn default() -> Self {
        Self::new(MomentTerms::default())
    }
}

impl MomentDetector {
    /// Terms are lowercased; empty terms and repeated endearments are dropped.
    pub fn new(terms: MomentTerms) -> Self {
        let mut endearments: Vec<String> = Vec::new();
        for term in normalize(terms.endearments) {
            if !endearments.contains(&term) {
                endearments.push(term);
            }
        }

        Self {
            terms: MomentTerms {
                endearments,
                intimate: normalize(terms.intimate),
                literature: normalize(terms.literature),
                movies: normalize(terms.movies),
                tv_shows: normalize(terms.tv_shows),
                social_topics: normalize(terms.social_topics),
            },
        }
    }

    /// Cultural category of lowercased `content`, first match wins.
    ///
    /// A title in book-title marks (`《…》`) counts as literature.
    pub fn category(&self, content: &str) -> Option<CultureCategory> {
        if has_title_marks(content) || contains_any(content, &self.terms.literature) {
            Some(CultureCategory::Literature)
        } else if contains_any(content, &self.terms.movies) {
            Some(CultureCategory::Movies)
        } else if contains_any(content, &self.terms.tv_shows) {
            Some(CultureCategory::TvShows)
        } else if contains_any(content, &self.terms.social_topics) {
            Some(CultureCategory::SocialTopics)
        } else {
            None
        }
    }

    /// Scan `messages`, which must be ordered by timestamp.
    ///
    /// Mentions are recorded once per timestamp and list.
    pub fn scan(&self, messages: &[Message]) -> LandmarkTopics {
        let mut topics = LandmarkTopics::default();

        for message in messages {
            let content = message.content.to_lowercase();
            let sender = Party::of(message);

            for term in &self.terms.endearments {
                if content.contains(term.as_str())
                    && !topics.terms_of_endearment.iter().any(|u| &u.term == term)
                {
                    topics.terms_of_endearment.push(EndearmentUse {
                        term: term.clone(),
                        first_occurrence: message.timestamp,
                        sender,
                    });
                }
            }

            if contains_any(&content, &self.terms.intimate) {
                record(&mut topics.intimate_topics, message, sender);
            }
            if let Some(category) = self.category(&content) {
                record(topics.mentions_mut(category), message, sender);
            }
        }

        topics
    }
}

fn normalize(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn contains_any(content: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| content.contains(t.as_str()))
}

fn has_title_marks(content: &str) -> bool {
    content
        .find('《')
        .is_some_and(|open| content[open..].contains('》'))
}

fn record(list: &mut Vec<TopicMention>, message: &Message, sender: Party) {
    if list.last().is_some_and(|m| m.timestamp == message.timestamp) {
        return;
    }
    list.push(TopicMention {
        timestamp: message.timestamp,
        sender,
        content: message.content.clone(),
    });
}

// ============================================
// Key dates
// ============================================

/// A key date file could not be used.
#[derive(Debug, Error)]
pub enum KeyDatesError {
    #[error("Failed to read key dates {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid key dates file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDate {
    #[serde(with = "date_format")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDays {
    #[serde(default)]
    pub anniversary: Option<KeyDate>,
    #[serde(default)]
    pub valentine: Vec<KeyDate>,
    #[serde(default)]
    pub qixi: Vec<KeyDate>,
}

/// Dates the user marks as significant.
///
/// ```json
/// {
///   "relationship_start": {"date": "2023-02-14", "description": "first date"},
///   "conflicts": [{"date": "2023-05-01"}],
///   "special_days": {"anniversary": {"date": "2024-02-14"}, "qixi": [{"date": "2023-08-22"}]}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDates {
    #[serde(default)]
    pub relationship_start: Option<KeyDate>,
    #[serde(default)]
    pub conflicts: Vec<KeyDate>,
    #[serde(default)]
    pub special_days: SpecialDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDateKind {
    RelationshipStart,
    Conflict,
    Anniversary,
    Valentine,
    Qixi,
}

impl KeyDates {
    pub fn load(path: &Path) -> Result<Self, KeyDatesError> {
        let text = fs::read_to_string(path).map_err(|source| KeyDatesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| KeyDatesError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Every date with its kind: relationship start, conflicts, then special days.
    pub fn entries(&self) -> Vec<(KeyDateKind, &KeyDate)> {
        let special = &self.special_days;
        self.relationship_start
            .iter()
            .map(|d| (KeyDateKind::RelationshipStart, d))
            .chain(self.conflicts.iter().map(|d| (KeyDateKind::Conflict, d)))
            .chain(special.anniversary.iter().map(|d| (KeyDateKind::Anniversary, d)))
            .chain(special.valentine.iter().map(|d| (KeyDateKind::Valentine, d)))
            .chain(special.qixi.iter().map(|d| (KeyDateKind::Qixi, d)))
            .collect()
    }
}

mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

// ============================================
// Before/after comparison
// ============================================

/// One party's messaging within a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PartyActivity {
    pub message_count: usize,
    /// Mean length in characters
    pub avg_length: f64,
    /// Mean gap between this party's consecutive messages, in seconds
    pub avg_response_secs: f64,
}

impl PartyActivity {
    fn compute(messages: &[&Message]) -> Self {
        if messages.is_empty() {
            return Self::default();
        }
        let total_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        let gaps: Vec<i64> = messages
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds())
            .collect();

        Self {
            message_count: messages.len(),
            avg_length: total_chars as f64 / messages.len() as f64,
            avg_response_secs: mean(gaps.iter().map(|&g| g as f64)),
        }
    }
}

/// Classifier annotations of the sessions that started within a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionMood {
    pub session_count: usize,
    pub avg_importance: f64,
    pub avg_depth: f64,
    /// Attitude label -> number of sessions
    pub attitudes: BTreeMap<String, usize>,
}

impl SessionMood {
    fn compute(sessions: &[&AnalyzedSession]) -> Self {
        let mut attitudes = BTreeMap::new();
        for session in sessions {
            *attitudes.entry(session.result.attitudes.clone()).or_insert(0) += 1;
        }

        Self {
            session_count: sessions.len(),
            avg_importance: mean(sessions.iter().map(|s| f64::from(s.result.importance))),
            avg_depth: mean(sessions.iter().map(|s| f64::from(s.result.depth))),
            attitudes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSummary {
    pub user: PartyActivity,
    pub partner: PartyActivity,
    pub sessions: SessionMood,
}

impl WindowSummary {
    fn compute(
        messages: &[Message],
        analyzed: &[AnalyzedSession],
        in_window: impl Fn(NaiveDateTime) -> bool,
    ) -> Self {
        let inside: Vec<&Message> = messages.iter().filter(|m| in_window(m.timestamp)).collect();
        let (user, partner): (Vec<&Message>, Vec<&Message>) =
            inside.into_iter().partition(|m| m.is_user);
        let sessions: Vec<&AnalyzedSession> = analyzed
            .iter()
            .filter(|s| in_window(s.session.first().timestamp))
            .collect();

        Self {
            user: PartyActivity::compute(&user),
            partner: PartyActivity::compute(&partner),
            sessions: SessionMood::compute(&sessions),
        }
    }
}

/// `after - before` for one party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActivityChange {
    pub message_count_change: i64,
    pub avg_length_change: f64,
    pub response_time_change: f64,
}

impl ActivityChange {
    fn between(before: &PartyActivity, after: &PartyActivity) -> Self {
        Self {
            message_count_change: after.message_count as i64 - before.message_count as i64,
            avg_length_change: after.avg_length - before.avg_length,
            response_time_change: after.avg_response_secs - before.avg_response_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowChange {
    pub user: ActivityChange,
    pub partner: ActivityChange,
    pub importance_change: f64,
    pub depth_change: f64,
}

/// Behaviour in the days before a key date against the days after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMoment {
    pub kind: KeyDateKind,
    #[serde(with = "date_format")]
    pub date: NaiveDate,
    pub description: String,
    pub before: WindowSummary,
    pub after: WindowSummary,
    pub change: WindowChange,
}

impl KeyMoment {
    /// Compare `[date - days, date)` with `[date, date + days]`, where
    /// `date` is midnight of the key date.
    pub fn compare(
        kind: KeyDateKind,
        key_date: &KeyDate,
        messages: &[Message],
        analyzed: &[AnalyzedSession],
        window_days: u32,
    ) -> Self {
        let pivot = NaiveDateTime::from(key_date.date);
        let span = Duration::days(i64::from(window_days));
        let (start, end) = (pivot - span, pivot + span);

        let before = WindowSummary::compute(messages, analyzed, |t| start <= t && t < pivot);
        let after = WindowSummary::compute(messages, analyzed, |t| pivot <= t && t <= end);
        let change = WindowChange {
            user: ActivityChange::between(&before.user, &after.user),
            partner: ActivityChange::between(&before.partner, &after.partner),
            importance_change: after.sessions.avg_importance - before.sessions.avg_importance,
            depth_change: after.sessions.avg_depth - before.sessions.avg_depth,
        };

        Self {
            kind,
            date: key_date.date,
            description: key_date.description.clone(),
            before,
            after,
            change,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Contents of `key_moments_analysis.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyMomentsReport {
    pub key_dates: KeyDates,
    pub landmark_topics: LandmarkTopics,
    pub attitude_changes: Vec<KeyMoment>,
}

impl KeyMomentsReport {
    pub fn build(
        detector: &MomentDetector,
        key_dates: KeyDates,
        messages: &[Message],
        analyzed: &[AnalyzedSession],
        window_days: u32,
    ) -> Self {
        let attitude_changes = key_dates
            .entries()
            .into_iter()
            .map(|(kind, date)| KeyMoment::compare(kind, date, messages, analyzed, window_days))
            .collect();

        Self {
            landmark_topics: detector.scan(messages),
            key_dates,
            attitude_changes,
        }
    }
}
