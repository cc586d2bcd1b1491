//! Fixed-delay retry policy.
//!
//! - At most `max_attempts` calls (never fewer than one)
//! - The same delay is slept *between* attempts, never after the last
//! - Sleeping goes through a [`Sleeper`] so tests can observe it instead of
//!   blocking

use std::time::Duration;

/// Default number of attempts per session.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Something that can pause the current thread.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeping via `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl<F> Sleeper for F
where
    F: Fn(Duration) + Send + Sync,
{
    fn sleep(&self, duration: Duration) {
        self(duration)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// The first success, or the error from the final attempt.
    pub result: Result<T, E>,
    /// Number of calls made (1-based).
    pub attempts: u32,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` below one is raised to one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Check if another attempt is allowed after `attempts` calls.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Call `op` until it succeeds or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. `on_failure` sees each
    /// failed attempt before the policy decides whether to wait and retry.
    pub fn run<T, E, F, L>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: F,
        mut on_failure: L,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        L: FnMut(u32, &E),
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) => {
                    on_failure(attempt, &e);
                    if !self.should_retry(attempt) {
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                        };
                    }
                    sleeper.sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
