//! chatlens library
//!
//! Splits two-party chat transcripts into sessions and annotates each session
//! with a topic, importance, depth and attitude through a remote classifier,
//! with checkpointed, resumable runs.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod report;
pub mod transcript;

pub use analyzer::{
    AnalyzedSession, ClassificationResult, Message, Pipeline, PipelineError, PipelineResult,
    RemoteClassifier, Session, Segmenter,
};
pub use config::Config;
