//! Topic annotation pipeline for two-party chat transcripts.
//!
//! Messages are split into sessions on time gaps, each session is sent to a
//! remote classifier, and the annotated sessions are checkpointed so a run can
//! be interrupted and resumed without repeating service calls.
//!
//! # Module Structure
//!
//! - [`types`] - Messages, sessions and classification results
//! - [`segment`] - Time-gap segmentation
//! - [`filter`] - Sensitive term redaction before content leaves the process
//! - [`repair`] - Recovery of JSON objects from free-form model output
//! - [`backend`] - Transports: agent CLIs and an HTTP chat-completions API
//! - [`classifier`] - Retrying classifier with a fallback result
//! - [`checkpoint`] - Atomic JSON checkpoints
//! - [`pipeline`] - The resumable orchestrator
//! - [`stats`] - Aggregate statistics over a finished run
//! - [`moments`] - Landmark topics and before/after comparisons around key dates

pub mod backend;
pub mod cancel;
pub mod checkpoint;
pub mod classifier;
pub mod error;
pub mod filter;
pub mod moments;
pub mod pipeline;
pub mod progress;
mod prompt;
pub mod repair;
pub mod retry;
pub mod segment;
pub mod stats;
pub mod tracker;
pub mod types;

pub use backend::{
    AgentType, BackendError, ClassifierBackend, ClassifyRequest, HttpBackend, HttpSettings,
};
pub use cancel::CancellationToken;
pub use checkpoint::{CheckpointStore, JsonCheckpointStore, CHECKPOINT_FILE_NAME};
pub use classifier::{Classified, RemoteClassifier};
pub use error::{CheckpointError, ClassifyError, PipelineError};
pub use filter::{ContentFilter, RedactionPolicy};
pub use moments::{KeyDates, KeyMomentsReport, MomentDetector, MomentTerms};
pub use pipeline::{Pipeline, PipelineOptions, PipelineRun, PipelineState, SessionClassifier};
pub use progress::{DefaultProgressReporter, ProgressReporter};
pub use repair::{repair_json, RepairError};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use segment::Segmenter;
pub use stats::{
    key_discussions, topic_counts, DepthScores, EngagementMetrics, PipelineResult, TopicCount,
};
pub use tracker::{UsageSummary, UsageTracker};
pub use types::{AnalyzedSession, ClassificationResult, Message, Session};
