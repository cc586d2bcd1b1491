//! Aggregate statistics over analyzed sessions.
//!
//! Everything here is recomputed from the analyzed sessions and the message
//! stream on demand; nothing is persisted on its own except inside the final
//! results file.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use super::types::{AnalyzedSession, Message};

/// Default inclusive importance threshold for key discussions.
pub const DEFAULT_IMPORTANCE_THRESHOLD: u8 = 7;

/// New topics counted by the party that opened the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicInitiation {
    pub user: usize,
    pub partner: usize,
}

/// Mean response latency in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResponsePatterns {
    pub user_avg_response_time: f64,
    /// Mean of the per-sender means minus the user mean.
    ///
    /// Kept for compatibility with earlier reports; it is not the partner's
    /// own mean latency.
    pub partner_avg_response_time: f64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineResult {
    pub topic_initiation: TopicInitiation,
    pub response_patterns: ResponsePatterns,
}

impl PipelineResult {
    /// Compute the summary.
    ///
    /// `response_times[i]` is the latency of `messages[i]` in seconds (`None`
    /// for the first message).
    pub fn compute(
        analyzed: &[AnalyzedSession],
        messages: &[Message],
        response_times: &[Option<f64>],
    ) -> Self {
        Self {
            topic_initiation: topic_initiation(analyzed),
            response_patterns: response_patterns(messages, response_times),
        }
    }
}

fn topic_initiation(analyzed: &[AnalyzedSession]) -> TopicInitiation {
    let mut counts = TopicInitiation::default();
    for session in analyzed.iter().filter(|a| a.result.is_new_topic) {
        if session.opened_by_user() {
            counts.user += 1;
        } else {
            counts.partner += 1;
        }
    }
    counts
}

fn response_patterns(messages: &[Message], response_times: &[Option<f64>]) -> ResponsePatterns {
    // sender -> (sum, count), plus the user's own totals
    let mut per_sender: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    let mut user = (0.0, 0usize);

    for (message, time) in messages.iter().zip(response_times) {
        let Some(secs) = time else { continue };
        let entry = per_sender.entry(message.sender.as_str()).or_insert((0.0, 0));
        entry.0 += secs;
        entry.1 += 1;
        if message.is_user {
            user.0 += secs;
            user.1 += 1;
        }
    }

    let user_avg = mean(user.0, user.1);
    let sender_means: Vec<f64> = per_sender.values().map(|(sum, n)| mean(*sum, *n)).collect();
    let mean_of_means = mean(sender_means.iter().sum(), sender_means.len());

    ResponsePatterns {
        user_avg_response_time: user_avg,
        partner_avg_response_time: if sender_means.is_empty() {
            0.0
        } else {
            mean_of_means - user_avg
        },
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Sessions whose importance is at or above `threshold`, in order.
pub fn key_discussions(analyzed: &[AnalyzedSession], threshold: u8) -> Vec<&AnalyzedSession> {
    analyzed
        .iter()
        .filter(|a| a.result.importance >= threshold)
        .collect()
}

/// How often a topic was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

/// Topic frequencies, most frequent first, ties by name.
pub fn topic_counts(analyzed: &[AnalyzedSession]) -> Vec<TopicCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for session in analyzed {
        *counts.entry(session.result.topic.as_str()).or_insert(0) += 1;
    }

    let mut sorted: Vec<TopicCount> = counts
        .into_iter()
        .map(|(topic, count)| TopicCount {
            topic: topic.to_string(),
            count,
        })
        .collect();
    // BTreeMap order already sorts names; a stable sort keeps it for ties
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
}

/// Summed conversation depth of the sessions each party opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DepthScores {
    pub user_score: u32,
    pub partner_score: u32,
}

impl DepthScores {
    pub fn compute(analyzed: &[AnalyzedSession]) -> Self {
        let mut scores = Self::default();
        for session in analyzed {
            let depth = u32::from(session.result.depth);
            if session.opened_by_user() {
                scores.user_score += depth;
            } else {
                scores.partner_score += depth;
            }
        }
        scores
    }
}

/// Message volume per sender over time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngagementMetrics {
    /// sender -> `YYYY-MM-DD` -> messages
    pub daily_messages: BTreeMap<String, BTreeMap<String, usize>>,
    /// sender -> hour of day (0-23) -> messages
    pub hourly_messages: BTreeMap<String, BTreeMap<u32, usize>>,
}

impl EngagementMetrics {
    pub fn compute(messages: &[Message]) -> Self {
        let mut metrics = Self::default();
        for message in messages {
            let day = message.timestamp.date().format("%Y-%m-%d").to_string();
            *metrics
                .daily_messages
                .entry(message.sender.clone())
                .or_default()
                .entry(day)
                .or_insert(0) += 1;
            *metrics
                .hourly_messages
                .entry(message.sender.clone())
                .or_default()
                .entry(message.timestamp.hour())
                .or_insert(0) += 1;
        }
        metrics
    }
}
