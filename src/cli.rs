//! CLI definitions for chatlens
//!
//! This module contains the clap CLI structure definitions, separated from main.rs
//! so tests can parse arguments without spawning the binary.

use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

/// Build clap styles for a consistent CLI appearance.
///
/// - Green: headers, usage, command names
/// - White: descriptions, placeholders (renders as light gray on dark terminals)
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default()) // Light gray for descriptions
        .valid(AnsiColor::White.on_default()) // Light gray for valid values
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "chatlens")]
#[command(about = "[ chatlens ] - annotate chat transcripts with topics, importance and depth")]
#[command(
    long_about = "chatlens - Split a two-party chat transcript into sessions and annotate each
one with a topic, importance, depth and attitude using an AI classifier.

Runs are checkpointed to <output-dir>/intermediate_results.json. An interrupted
run (Ctrl+C, terminal hangup) resumes where it stopped when started again with
the same transcript.

QUICK START:
    chatlens sessions chat.txt              Preview the session split
    chatlens analyze chat.txt Alice         Annotate, writing analysis_results/
    chatlens config show                    Show the effective configuration"
)]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Annotate every session of a transcript
    #[command(long_about = "Annotate every session of a chat transcript with an AI classifier.

Messages are grouped into sessions wherever the gap between two messages
exceeds the time threshold. Each session is sent to the classifier; answers
that cannot be used after all retries get a neutral fallback annotation.

Progress is checkpointed every --checkpoint-interval sessions. Re-running
the same command after an interruption skips the sessions already done.
Use --fresh to ignore an existing checkpoint.

Results land in the output directory:
    analysis_results.json    statistics, key discussions, topic counts
    summary_report.txt       plain-text digest
    key_moments_analysis.json
                             landmark topics and, with --key-dates, how
                             messaging changed around each date

EXAMPLES:
    chatlens analyze chat.txt Alice
    chatlens analyze chat.txt Alice --agent claude --timeout 60
    chatlens analyze chat.txt Alice --time-threshold 3600 --fresh
    chatlens analyze chat.txt Alice --key-dates dates.json

SUPPORTED AGENTS:
    http        OpenAI-compatible API, the default (see [http] in the config)
    claude      Claude Code CLI
    codex       OpenAI Codex CLI
    gemini      Google Gemini CLI")]
    Analyze(AnalyzeArgs),

    /// Show how a transcript splits into sessions
    #[command(long_about = "Parse a transcript and list its sessions without calling any classifier.

EXAMPLES:
    chatlens sessions chat.txt
    chatlens sessions chat.txt --time-threshold 600")]
    Sessions {
        /// Path to the transcript
        #[arg(help = "Path to the chat transcript")]
        chat_file: PathBuf,
        /// Gap in seconds that starts a new session
        #[arg(long, help = "Gap in seconds that starts a new session (overrides config)")]
        time_threshold: Option<u64>,
    },

    /// Configuration management
    #[command(
        subcommand,
        long_about = "View the chatlens configuration.

Configuration is stored in ~/.config/chatlens/config.toml. Every key is
optional; command-line flags override it.

EXAMPLES:
    chatlens config show     Display the effective configuration
    chatlens config path     Print the config file location"
    )]
    Config(ConfigCommands),
}

/// Arguments of `chatlens analyze`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeArgs {
    /// Path to the transcript
    #[arg(help = "Path to the chat transcript")]
    pub chat_file: PathBuf,
    /// Sender name that identifies the user
    #[arg(help = "Your sender name as it appears in the transcript")]
    pub user_name: String,
    #[arg(long, short, help = "Directory for checkpoints and results (overrides config)")]
    pub output_dir: Option<PathBuf>,
    #[arg(long, short, help = "Classifier backend to use (overrides config)")]
    pub agent: Option<String>,
    #[arg(long, help = "Gap in seconds that starts a new session")]
    pub time_threshold: Option<u64>,
    #[arg(long, help = "Attempts per session before falling back")]
    pub max_retries: Option<u32>,
    #[arg(long, help = "Seconds to wait between attempts")]
    pub retry_delay: Option<u64>,
    #[arg(long, help = "Sessions between checkpoint writes")]
    pub checkpoint_interval: Option<usize>,
    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(1..=10),
        help = "Minimum importance of a key discussion (1-10)"
    )]
    pub importance_threshold: Option<u8>,
    #[arg(long, help = "Timeout per classifier call in seconds")]
    pub timeout: Option<u64>,
    #[arg(long, value_name = "PATH", help = "JSON file of key dates to compare before and after")]
    pub key_dates: Option<PathBuf>,
    #[arg(long, help = "Ignore and remove any existing checkpoint")]
    pub fresh: bool,
    #[arg(long, short, help = "Suppress progress output")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    #[command(long_about = "Display the effective configuration in TOML format.

Values missing from the config file are shown with their defaults.

EXAMPLE:
    chatlens config show")]
    Show,
    /// Print the config file path
    Path,
}
