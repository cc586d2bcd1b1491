//! Checkpointed, resumable orchestration of a classification run.
//!
//! # Workflow
//!
//! 1. Load the checkpoint and check it lines up with the transcript
//! 2. Segment the transcript and skip the sessions already analyzed
//! 3. For each remaining session: check cancellation, classify, append
//! 4. Persist every `checkpoint_interval` sessions and after the last one
//! 5. Compute aggregate statistics
//!
//! A session whose classifier fails still gets a (fallback) result so the
//! analyzed list always matches the leading sessions of the segmentation.
//! That alignment is what makes `resume_index = analyzed.len()` valid.

use std::time::Instant;

use tracing::{info, warn};

use super::cancel::CancellationToken;
use super::checkpoint::CheckpointStore;
use super::classifier::Classified;
use super::error::{ClassifyError, PipelineError};
use super::progress::{content_preview, ProgressReporter};
use super::segment::{Segmenter, DEFAULT_TIME_THRESHOLD_SECS};
use super::stats::PipelineResult;
use super::tracker::{SessionUsage, UsageTracker};
use super::types::{AnalyzedSession, ClassificationResult, Message, Session};
use crate::transcript::response_times;

/// Default number of sessions between checkpoint writes.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Interrupted,
}

/// Classifies one session. The seam between orchestration and transport.
pub trait SessionClassifier {
    fn classify(&self, session: &Session) -> Result<Classified, ClassifyError>;
}

/// Tunables for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub time_threshold_secs: u64,
    /// Persist after every this many sessions (at least 1)
    pub checkpoint_interval: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            time_threshold_secs: DEFAULT_TIME_THRESHOLD_SECS,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

impl PipelineOptions {
    pub fn time_threshold(mut self, secs: u64) -> Self {
        self.time_threshold_secs = secs;
        self
    }

    pub fn checkpoint_interval(mut self, sessions: usize) -> Self {
        self.checkpoint_interval = sessions.max(1);
        self
    }

    /// Effective checkpoint interval; zero is treated as one.
    fn interval(&self) -> usize {
        self.checkpoint_interval.max(1)
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct PipelineRun {
    /// All analyzed sessions, resumed ones first
    pub analyzed: Vec<AnalyzedSession>,
    pub result: PipelineResult,
    /// Sessions restored from the checkpoint
    pub resumed: usize,
    /// Sessions that got the fallback result in this run
    pub fallbacks: usize,
    pub tracker: UsageTracker,
}

/// The orchestrator.
pub struct Pipeline<'a> {
    options: PipelineOptions,
    classifier: &'a dyn SessionClassifier,
    store: &'a dyn CheckpointStore,
    progress: &'a dyn ProgressReporter,
    cancel: CancellationToken,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        options: PipelineOptions,
        classifier: &'a dyn SessionClassifier,
        store: &'a dyn CheckpointStore,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            options,
            classifier,
            store,
            progress,
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
        }
    }

    /// Observe `token` between sessions.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run over `messages`, which must be ordered by timestamp.
    pub fn run(&mut self, messages: &[Message]) -> Result<PipelineRun, PipelineError> {
        self.state = PipelineState::Running;

        let segmenter = Segmenter::new(self.options.time_threshold_secs);
        let total = segmenter.count(messages);

        let mut analyzed = self.store.load();
        if let Err(reason) = check_alignment(&analyzed, &segmenter, messages, total) {
            warn!(reason = %reason, "discarding checkpoint");
            self.progress.checkpoint_discarded(&reason);
            analyzed.clear();
        }
        let resumed = analyzed.len();
        info!(total, resumed, "starting classification run");
        self.progress.start(total, resumed);

        let mut tracker = UsageTracker::new();
        let mut fallbacks = 0;

        for (index, session) in segmenter.segment(messages).enumerate().skip(resumed) {
            if self.cancel.is_cancelled() {
                return Err(self.interrupt(&analyzed, total));
            }

            let started = Instant::now();
            let classified = self.classify(index, &session);
            let message_count = session.len();

            // A fallback produced while the run was being cancelled usually
            // means the call itself was interrupted. Leave the session for
            // the resumed run instead of recording the fallback.
            if classified.is_fallback() && self.cancel.is_cancelled() {
                info!(session = index + 1, "dropping session interrupted mid-call");
                return Err(self.interrupt(&analyzed, total));
            }

            if let Some(reason) = &classified.last_error {
                fallbacks += 1;
                self.progress.session_fallback(
                    index,
                    message_count,
                    &content_preview(&session.first().content),
                    reason,
                );
            }
            tracker.record(SessionUsage {
                index,
                message_count,
                duration: started.elapsed(),
                success: !classified.is_fallback(),
                attempts: classified.attempts,
            });
            self.progress.session_completed(index, total, &classified);

            analyzed.push(AnalyzedSession::new(session, classified.result));

            let position = index + 1;
            if position % self.options.interval() == 0 || position == total {
                self.persist(&analyzed);
            }
        }

        let result = PipelineResult::compute(&analyzed, messages, &response_times(messages));
        self.state = PipelineState::Completed;
        self.progress.finish(total, fallbacks);

        Ok(PipelineRun {
            analyzed,
            result,
            resumed,
            fallbacks,
            tracker,
        })
    }

    /// Classify one session, absorbing classifier errors into a fallback.
    fn classify(&self, index: usize, session: &Session) -> Classified {
        match self.classifier.classify(session) {
            Ok(classified) => classified,
            Err(e) => {
                warn!(session = index + 1, error = %e, "session classification failed");
                Classified {
                    result: ClassificationResult::fallback(&e),
                    attempts: 1,
                    last_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Save the full list; failures are reported, never fatal.
    fn persist(&self, analyzed: &[AnalyzedSession]) -> bool {
        match self.store.save(analyzed) {
            Ok(()) => {
                self.progress.checkpoint_saved(analyzed.len());
                true
            }
            Err(e) => {
                warn!(error = %e, "checkpoint write failed");
                self.progress.checkpoint_failed(&e);
                false
            }
        }
    }

    fn interrupt(&mut self, analyzed: &[AnalyzedSession], total: usize) -> PipelineError {
        self.state = PipelineState::Interrupted;
        let checkpoint_saved = self.persist(analyzed);
        info!(completed = analyzed.len(), total, "run interrupted");
        self.progress.interrupted(analyzed.len(), total);

        PipelineError::Cancelled {
            completed: analyzed.len(),
            total,
            checkpoint_saved,
        }
    }
}

/// Check that checkpointed sessions are the leading sessions of `messages`.
///
/// Sessions are compared by message count and first timestamp.
fn check_alignment(
    analyzed: &[AnalyzedSession],
    segmenter: &Segmenter,
    messages: &[Message],
    total: usize,
) -> Result<(), String> {
    if analyzed.len() > total {
        return Err(format!(
            "checkpoint has {} sessions but the transcript has {}",
            analyzed.len(),
            total
        ));
    }

    for (index, (saved, current)) in analyzed.iter().zip(segmenter.segment(messages)).enumerate() {
        if saved.session.len() != current.len()
            || saved.session.first().timestamp != current.first().timestamp
        {
            return Err(format!(
                "session {} differs from the transcript (different file or time threshold?)",
                index + 1
            ));
        }
    }

    Ok(())
}
