//! Prompt building for session classification.
//!
//! Templates live in `src/analyzer/prompts/` and are embedded at compile
//! time. The transcript is rendered one line per message:
//! `sender (YYYY-MM-DD HH:MM:SS): content`, after content filtering.

use super::backend::ClassifyRequest;
use super::filter::ContentFilter;
use super::types::Session;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/classify_system.txt");
const USER_TEMPLATE: &str = include_str!("prompts/classify.txt");

/// Render a session as transcript lines, filtering each message's content.
pub fn render_transcript(session: &Session, filter: &ContentFilter) -> String {
    session
        .messages()
        .iter()
        .map(|m| {
            format!(
                "{} ({}): {}",
                m.sender,
                m.formatted_timestamp(),
                filter.apply(&m.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full classification request for a session.
pub fn build_classify_request(session: &Session, filter: &ContentFilter) -> ClassifyRequest {
    let transcript = render_transcript(session, filter);

    // Transcript goes last so its text cannot collide with placeholders
    let user = USER_TEMPLATE
        .replace("{message_count}", &session.len().to_string())
        .replace("{start_time}", &session.first().formatted_timestamp())
        .replace("{end_time}", &session.last().formatted_timestamp())
        .replace("{transcript}", &transcript);

    ClassifyRequest::new(SYSTEM_TEMPLATE, user)
}
