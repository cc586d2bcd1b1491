//! Sessions command handler
//!
//! Shows how a transcript splits into sessions, without calling a classifier.

use std::path::Path;

use anyhow::{Context, Result};

use chatlens::analyzer::segment::DEFAULT_TIME_THRESHOLD_SECS;
use chatlens::analyzer::{Message, Segmenter};
use chatlens::{transcript, Config};

use super::truncate_string;

/// Width of the opening-line column.
const PREVIEW_WIDTH: usize = 40;

#[cfg(not(tarpaulin_include))]
pub fn handle(chat_file: &Path, time_threshold: Option<u64>) -> Result<()> {
    let config = Config::load()?;
    let threshold = time_threshold
        .or(config.analysis.time_threshold)
        .unwrap_or(DEFAULT_TIME_THRESHOLD_SECS);

    if !chat_file.exists() {
        anyhow::bail!("File not found: {}", chat_file.display());
    }
    // The user name only affects is_user, which this listing does not show
    let messages = transcript::parse_file(chat_file, "")
        .with_context(|| format!("Failed to load {}", chat_file.display()))?;

    print!("{}", render_sessions(&messages, threshold));
    Ok(())
}

/// Render the session table.
pub fn render_sessions(messages: &[Message], threshold: u64) -> String {
    let segmenter = Segmenter::new(threshold);
    let mut out = format!(
        "{} messages, {} sessions (gap threshold {}s)\n",
        messages.len(),
        segmenter.count(messages),
        threshold
    );

    for (index, session) in segmenter.segment(messages).enumerate() {
        let first = session.first();
        out.push_str(&format!(
            "{:>4}  {}  {:>4} msg  {:<12}  {}\n",
            index + 1,
            first.formatted_timestamp(),
            session.len(),
            truncate_string(&first.sender, 12),
            truncate_string(&first.content.replace('\n', " "), PREVIEW_WIDTH)
        ));
    }
    out
}
