//! Attempt budgets and linear backoff for the two processing phases.

use std::fmt;
use util::config::RetrySettings;

/// Message stored when a phase runs out of attempts without a more specific reason.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Retry-budget scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Remote creation and content upload.
    Send,
    /// Report generation request and score polling.
    Report,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Send => write!(f, "send"),
            Phase::Report => write!(f, "report"),
        }
    }
}

/// Result of recording one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: i32,
    pub next_retry_not_before: i64,
    /// The phase maximum has been reached; the caller must stop retrying.
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    send_max_attempts: i32,
    send_interval: i64,
    report_max_attempts: i32,
    report_interval: i64,
    report_first_retry: i64,
}

impl RetryPolicy {
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            send_max_attempts: settings.send_max_attempts.max(1),
            send_interval: settings.send_retry_seconds.max(1),
            report_max_attempts: settings.report_max_attempts.max(1),
            report_interval: settings.report_retry_seconds.max(1),
            report_first_retry: settings.report_first_retry_seconds.max(1),
        }
    }

    pub fn max_attempts(&self, phase: Phase) -> i32 {
        match phase {
            Phase::Send => self.send_max_attempts,
            Phase::Report => self.report_max_attempts,
        }
    }

    /// Seconds to wait after the `attempt`-th failure of a phase.
    ///
    /// Linear in `attempt`, except that the first report-phase failure uses the
    /// short first retry so a webhook race resolves quickly.
    pub fn wait(&self, phase: Phase, attempt: i32) -> i64 {
        let attempt = i64::from(attempt.max(1));
        match phase {
            Phase::Send => attempt * self.send_interval,
            Phase::Report if attempt == 1 => self.report_first_retry,
            Phase::Report => attempt * self.report_interval,
        }
    }

    pub fn is_exhausted(&self, phase: Phase, attempts: i32) -> bool {
        attempts >= self.max_attempts(phase)
    }

    /// Records one more failure on top of `attempts`.
    pub fn record_failure(&self, phase: Phase, attempts: i32, now: i64) -> Backoff {
        let max = self.max_attempts(phase);
        let attempts = (attempts + 1).min(max);
        Backoff {
            attempts,
            next_retry_not_before: now + self.wait(phase, attempts),
            exhausted: attempts >= max,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}
