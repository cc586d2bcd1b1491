//! Usage tracking for a classification run.
//!
//! Records, per session, how long classification took, how many attempts it
//! needed and whether the service ever produced a usable answer. The summary
//! is printed at the end of a run and embedded in the results file.

use serde::Serialize;
use std::time::{Duration, Instant};

/// Usage information for a single session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUsage {
    /// Absolute 0-based session index
    pub index: usize,
    pub message_count: usize,
    pub duration: Duration,
    /// False when the fallback result was used
    pub success: bool,
    pub attempts: u32,
}

/// Summary report of a run's usage.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub sessions_processed: usize,
    pub successful_sessions: usize,
    pub fallback_sessions: usize,
    pub messages_sent: usize,
    #[serde(rename = "total_duration_secs", serialize_with = "as_secs")]
    pub total_duration: Duration,
    #[serde(rename = "avg_duration_per_session_secs", serialize_with = "as_secs")]
    pub avg_duration_per_session: Duration,
    /// Success rate (0.0 - 1.0)
    pub success_rate: f64,
    pub total_retries: usize,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((d.as_secs_f64() * 100.0).round() / 100.0)
}

/// Collects per-session usage during a run.
#[derive(Debug)]
pub struct UsageTracker {
    sessions: Vec<SessionUsage>,
    start_time: Instant,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record(&mut self, usage: SessionUsage) {
        self.sessions.push(usage);
    }

    pub fn sessions(&self) -> &[SessionUsage] {
        &self.sessions
    }

    pub fn get(&self, index: usize) -> Option<&SessionUsage> {
        self.sessions.iter().find(|u| u.index == index)
    }

    /// Get total elapsed time since tracking started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn summary(&self) -> UsageSummary {
        let sessions_processed = self.sessions.len();
        let successful_sessions = self.sessions.iter().filter(|u| u.success).count();
        let messages_sent = self.sessions.iter().map(|u| u.message_count).sum();
        let total_duration = self.elapsed();

        let avg_duration_per_session = if sessions_processed > 0 {
            self.sessions.iter().map(|u| u.duration).sum::<Duration>() / sessions_processed as u32
        } else {
            Duration::ZERO
        };

        let success_rate = if sessions_processed > 0 {
            successful_sessions as f64 / sessions_processed as f64
        } else {
            0.0
        };

        // The first attempt is not a retry
        let total_retries = self
            .sessions
            .iter()
            .map(|u| u.attempts.saturating_sub(1) as usize)
            .sum();

        UsageSummary {
            sessions_processed,
            successful_sessions,
            fallback_sessions: sessions_processed - successful_sessions,
            messages_sent,
            total_duration,
            avg_duration_per_session,
            success_rate,
            total_retries,
        }
    }

    /// Format summary for display.
    pub fn format_summary(&self) -> String {
        let summary = self.summary();
        let mut output = String::new();

        output.push_str("\nClassification Summary:\n");
        output.push_str(&format!(
            "   Sessions classified: {}\n",
            summary.sessions_processed
        ));
        output.push_str(&format!("   Messages sent: {}\n", summary.messages_sent));
        output.push_str(&format!(
            "   Total duration: {}\n",
            format_duration(summary.total_duration)
        ));
        output.push_str(&format!(
            "   Success rate: {:.0}%\n",
            summary.success_rate * 100.0
        ));

        if summary.total_retries > 0 {
            output.push_str(&format!("   Retries: {}\n", summary.total_retries));
        }
        if summary.fallback_sessions > 0 {
            output.push_str(&format!(
                "   Fallback results: {}\n",
                summary.fallback_sessions
            ));
        }

        output
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
