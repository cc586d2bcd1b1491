//! Progress reporting for a classification run.
//!
//! The orchestrator reports through the [`ProgressReporter`] trait so that
//! tests and `--quiet` runs stay silent. [`DefaultProgressReporter`] writes a
//! single updating line to stderr, and full lines for events worth keeping.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::classifier::Classified;
use super::error::CheckpointError;

/// Characters of message content shown for a fallback session.
pub const PREVIEW_CHARS: usize = 100;

/// Receives progress events from the orchestrator.
pub trait ProgressReporter {
    /// The run is starting; `resumed` sessions were restored from a checkpoint.
    fn start(&self, total: usize, resumed: usize);

    /// Session `index` (0-based, absolute) has been classified.
    fn session_completed(&self, index: usize, total: usize, classified: &Classified);

    /// Session `index` got the fallback result.
    fn session_fallback(&self, index: usize, message_count: usize, preview: &str, reason: &str);

    fn checkpoint_saved(&self, sessions: usize);

    fn checkpoint_failed(&self, error: &CheckpointError);

    /// A checkpoint existed but did not match the transcript.
    fn checkpoint_discarded(&self, reason: &str);

    fn interrupted(&self, completed: usize, total: usize);

    fn finish(&self, total: usize, fallbacks: usize);
}

/// Progress reporter that writes to stderr.
pub struct DefaultProgressReporter {
    /// Sessions classified in this run
    completed: AtomicUsize,
    /// Whether to show output (disabled for quiet mode)
    show_output: bool,
    /// Whether an updating `\r` line is currently on screen
    line_open: AtomicBool,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            completed: AtomicUsize::new(0),
            show_output: true,
            line_open: AtomicBool::new(false),
        }
    }

    /// Create a progress reporter with output disabled.
    pub fn quiet() -> Self {
        Self {
            completed: AtomicUsize::new(0),
            show_output: false,
            line_open: AtomicBool::new(false),
        }
    }

    /// Sessions classified so far in this run.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Clear the progress line before printing a full line.
    fn clear_line(&self) {
        if self.line_open.swap(false, Ordering::SeqCst) {
            eprint!("\r{:60}\r", "");
        }
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn start(&self, total: usize, resumed: usize) {
        if !self.show_output {
            return;
        }
        if resumed > 0 {
            eprintln!(
                "Resuming from checkpoint: {} of {} session{} already analyzed",
                resumed,
                total,
                plural(total)
            );
        } else {
            eprintln!("Analyzing {} session{}...", total, plural(total));
        }
    }

    fn session_completed(&self, index: usize, total: usize, classified: &Classified) {
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.show_output {
            let retry_note = if classified.attempts > 1 {
                format!(" ({} attempts)", classified.attempts)
            } else {
                String::new()
            };
            eprint!("\r  [{}/{}] Classifying sessions...{}", index + 1, total, retry_note);
            let _ = io::stderr().flush();
            self.line_open.store(true, Ordering::SeqCst);
        }
    }

    fn session_fallback(&self, index: usize, message_count: usize, preview: &str, reason: &str) {
        if !self.show_output {
            return;
        }
        self.clear_line();
        eprintln!(
            "Warning: session {} ({} message{}) could not be classified: {}",
            index + 1,
            message_count,
            plural(message_count),
            reason
        );
        eprintln!("   Content: {}", preview);
    }

    fn checkpoint_saved(&self, sessions: usize) {
        if !self.show_output {
            return;
        }
        self.clear_line();
        eprintln!("Checkpoint saved ({} session{})", sessions, plural(sessions));
    }

    fn checkpoint_failed(&self, error: &CheckpointError) {
        if !self.show_output {
            return;
        }
        self.clear_line();
        eprintln!("Warning: {}", error);
    }

    fn checkpoint_discarded(&self, reason: &str) {
        if !self.show_output {
            return;
        }
        self.clear_line();
        eprintln!("Warning: ignoring checkpoint ({}); starting fresh", reason);
    }

    fn interrupted(&self, completed: usize, total: usize) {
        if !self.show_output {
            return;
        }
        self.clear_line();
        eprintln!(
            "Interrupted: {} of {} sessions analyzed, progress saved",
            completed, total
        );
    }

    fn finish(&self, total: usize, fallbacks: usize) {
        if !self.show_output {
            return;
        }
        self.clear_line();
        if fallbacks > 0 {
            eprintln!(
                "Analyzed {} session{} ({} with fallback results)",
                total,
                plural(total),
                fallbacks
            );
        } else {
            eprintln!("Analyzed {} session{}", total, plural(total));
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// First `PREVIEW_CHARS` characters of `text` on one line.
pub fn content_preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() > PREVIEW_CHARS {
        let head: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        flat
    }
}
