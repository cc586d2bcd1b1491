//! Result files written after a completed run.
//!
//! Three files land in the output directory:
//! - `analysis_results.json` - machine-readable statistics and key discussions
//! - `summary_report.txt` - a plain-text digest of the same data
//! - `key_moments_analysis.json` - landmark topics and key-date comparisons
//!
//! Each is written to a temporary file and renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analyzer::moments::{CultureCategory, KeyMomentsReport, Party};
use crate::analyzer::progress::content_preview;
use crate::analyzer::stats::{
    key_discussions, topic_counts, DepthScores, EngagementMetrics, PipelineResult,
    ResponsePatterns, TopicCount, TopicInitiation,
};
use crate::analyzer::tracker::UsageSummary;
use crate::analyzer::types::{AnalyzedSession, Message, TIMESTAMP_FORMAT};

pub const RESULTS_FILE_NAME: &str = "analysis_results.json";
pub const SUMMARY_FILE_NAME: &str = "summary_report.txt";
pub const KEY_MOMENTS_FILE_NAME: &str = "key_moments_analysis.json";

/// Everything reported about a run.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub session_count: usize,
    pub message_count: usize,
    pub response_patterns: ResponsePatterns,
    pub topic_initiation: TopicInitiation,
    pub engagement_scores: DepthScores,
    pub key_discussions: Vec<&'a AnalyzedSession>,
    pub topic_counts: Vec<TopicCount>,
    pub engagement_metrics: EngagementMetrics,
    pub usage: UsageSummary,
}

impl<'a> AnalysisReport<'a> {
    pub fn build(
        analyzed: &'a [AnalyzedSession],
        result: &PipelineResult,
        messages: &[Message],
        usage: UsageSummary,
        importance_threshold: u8,
    ) -> Self {
        Self {
            session_count: analyzed.len(),
            message_count: messages.len(),
            response_patterns: result.response_patterns,
            topic_initiation: result.topic_initiation,
            engagement_scores: DepthScores::compute(analyzed),
            key_discussions: key_discussions(analyzed, importance_threshold),
            topic_counts: topic_counts(analyzed),
            engagement_metrics: EngagementMetrics::compute(messages),
            usage,
        }
    }

    /// Render the plain-text summary.
    pub fn render_summary(&self) -> String {
        let mut lines = vec![
            "Chat Analysis Report".to_string(),
            "=".repeat(50),
            String::new(),
            "1. Engagement".to_string(),
            format!(
                "User average response time: {:.2}s",
                self.response_patterns.user_avg_response_time
            ),
            format!(
                "Partner average response time: {:.2}s",
                self.response_patterns.partner_avg_response_time
            ),
            format!(
                "Conversation depth (sessions opened by user / partner): {} / {}",
                self.engagement_scores.user_score, self.engagement_scores.partner_score
            ),
            String::new(),
            "2. Topic initiation".to_string(),
            format!("Topics started by user: {}", self.topic_initiation.user),
            format!("Topics started by partner: {}", self.topic_initiation.partner),
            String::new(),
            "3. Key discussions".to_string(),
        ];

        if self.key_discussions.is_empty() {
            lines.push("(none)".to_string());
        }
        for (i, discussion) in self.key_discussions.iter().enumerate() {
            let analysis = &discussion.result;
            lines.push(String::new());
            lines.push(format!("Key discussion {}:", i + 1));
            lines.push(format!("Topic: {}", analysis.topic));
            lines.push(format!("Importance: {}/10", analysis.importance));
            lines.push(format!("Depth: {}/10", analysis.depth));
            lines.push(format!("Attitudes: {}", analysis.attitudes));
            lines.push("Messages:".to_string());
            for message in discussion.session.messages() {
                lines.push(format!(
                    "{} - {}: {}",
                    message.formatted_timestamp(),
                    message.sender,
                    content_preview(&message.content)
                ));
            }
        }

        lines.push(String::new());
        lines.push("4. Topics".to_string());
        for count in &self.topic_counts {
            lines.push(format!(
                "{}: {} discussion{}",
                count.topic,
                count.count,
                if count.count == 1 { "" } else { "s" }
            ));
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

/// Section 5 of the summary: first endearments and landmark counts.
pub fn render_key_moments(moments: &KeyMomentsReport) -> String {
    let topics = &moments.landmark_topics;
    let mut lines = vec!["5. Key moments".to_string()];

    for term in &topics.terms_of_endearment {
        lines.push(format!(
            "First '{}': {} (by {})",
            term.term,
            term.first_occurrence.format(TIMESTAMP_FORMAT),
            match term.sender {
                Party::User => "user",
                Party::Partner => "partner",
            }
        ));
    }
    lines.push(format!("Intimate topics: {}", topics.intimate_topics.len()));
    for (label, category) in [
        ("Literature", CultureCategory::Literature),
        ("Movies", CultureCategory::Movies),
        ("TV shows", CultureCategory::TvShows),
        ("Social topics", CultureCategory::SocialTopics),
    ] {
        lines.push(format!("{}: {}", label, topics.mentions(category).len()));
    }
    for moment in &moments.attitude_changes {
        lines.push(format!(
            "{} ({:?}): user messages {:+}, partner messages {:+}",
            moment.date,
            moment.kind,
            moment.change.user.message_count_change,
            moment.change.partner.message_count_change
        ));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Paths of the written report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub results: PathBuf,
    pub summary: PathBuf,
    pub key_moments: PathBuf,
}

/// Write all report files into `dir`, creating it if needed.
pub fn write_reports(
    dir: &Path,
    report: &AnalysisReport<'_>,
    moments: &KeyMomentsReport,
) -> Result<ReportPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let json = serde_json::to_string_pretty(report).context("Failed to serialize results")?;
    let moments_json =
        serde_json::to_string_pretty(moments).context("Failed to serialize key moments")?;
    let summary = format!("{}\n{}", report.render_summary(), render_key_moments(moments));

    let paths = ReportPaths {
        results: dir.join(RESULTS_FILE_NAME),
        summary: dir.join(SUMMARY_FILE_NAME),
        key_moments: dir.join(KEY_MOMENTS_FILE_NAME),
    };
    write_atomic(&paths.results, &json)?;
    write_atomic(&paths.summary, &summary)?;
    write_atomic(&paths.key_moments, &moments_json)?;

    Ok(paths)
}

/// Write `contents` next to `path` and rename it into place.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    if let Err(e) = fs::rename(&temp_path, path) {
        // Clean up temp file on failure
        let _ = fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("Failed to write {}", path.display()));
    }
    Ok(())
}
