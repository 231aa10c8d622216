//! Bounded polling for output produced by another process.
//!
//! Live writes its log asynchronously and a helper may be copying it; the
//! caller keeps one [`ReadRetry`] per read and asks it, after each look at the
//! output, whether to parse now, wait again or give up.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::settings::RetrySettings;

/// 每次輪詢後的決定。 / What to do after one polling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    RetryAfter(Duration),
    /// Attempts exhausted; parse whatever output exists.
    TimedOut,
}

/// Partial output counts as complete from this attempt on.
const PARTIAL_READY_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRetry {
    attempts: u32,
    max_attempts: u32,
    initial_delay: Duration,
    interval: Duration,
}

impl ReadRetry {
    pub fn new(max_attempts: u32, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts: max_attempts.max(1),
            initial_delay,
            interval,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.initial_delay_ms),
            Duration::from_millis(settings.interval_ms),
        )
    }

    /// Delay before the first look at the output.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records one look at the output.
    ///
    /// `done` is the completion marker; without it, non-empty partial output is
    /// accepted once at least two attempts have been made.
    pub fn poll(&mut self, done: bool, partial_len: u64) -> PollOutcome {
        if done {
            return PollOutcome::Ready;
        }
        self.attempts += 1;
        if partial_len > 0 && self.attempts >= PARTIAL_READY_ATTEMPTS {
            return PollOutcome::Ready;
        }
        if self.attempts < self.max_attempts {
            PollOutcome::RetryAfter(self.interval)
        } else {
            PollOutcome::TimedOut
        }
    }
}

/// Polls `output` (and the optional `done_marker`) until ready or out of attempts.
///
/// `sleep` is injected so tests do not wait for real.
pub fn wait_for_output<S>(
    output: &Path,
    done_marker: Option<&Path>,
    retry: &mut ReadRetry,
    mut sleep: S,
) -> PollOutcome
where
    S: FnMut(Duration),
{
    sleep(retry.initial_delay());
    loop {
        let done = done_marker.map(Path::exists).unwrap_or(false);
        let len = fs::metadata(output).map(|meta| meta.len()).unwrap_or(0);
        match retry.poll(done, len) {
            PollOutcome::RetryAfter(delay) => {
                debug!(
                    "waiting for {} (attempt {}, {} bytes so far)",
                    output.display(),
                    retry.attempts(),
                    len
                );
                sleep(delay);
            }
            outcome => return outcome,
        }
    }
}
