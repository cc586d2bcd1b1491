//! Chat transcript input.
//!
//! - [`parser`] - Reads exported transcripts into ordered [`Message`]s
//! - [`response_time`] - Per-message latency since the previous message
//!
//! [`Message`]: crate::analyzer::Message

pub mod parser;
pub mod response_time;

pub use parser::{parse_file, parse_transcript, TranscriptError};
pub use response_time::response_times;
