//! Cooperative cancellation for a pipeline run.
//!
//! A [`CancellationToken`] is a shared flag. Signal handlers (SIGINT via
//! `ctrlc`, SIGHUP via `signal-hook`) set it; the orchestrator checks it
//! between sessions, saves a checkpoint, and stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, clonable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Register SIGINT (Ctrl+C) and SIGHUP (terminal hangup) handlers.
    ///
    /// Both set this token. Safe to call more than once: a second `ctrlc`
    /// registration is ignored.
    pub fn register_signal_handlers(&self) {
        let flag = self.cancelled.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .ok(); // Ignore if handler already set

        #[cfg(unix)]
        {
            use signal_hook::flag::register;
            let _ = register(libc::SIGHUP, self.cancelled.clone());
        }
    }
}
