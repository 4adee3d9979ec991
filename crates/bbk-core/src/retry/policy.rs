use std::time::Duration;

use crate::config::BackupConfig;

/// High-level classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read/call).
    Timeout,
    /// Network-level failure (connection refused/reset, DNS, ...).
    Connection,
    /// Server answered with a non-2xx status.
    HttpStatus,
    /// Freshly downloaded content did not match the catalog digest.
    Corrupt,
    /// Local disk failures, cancellation, malformed catalog data. Never retried.
    Fatal,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay (zero = immediately).
    RetryAfter(Duration),
}

/// Fixed-delay policy: `max_attempts` tries in total, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_retries(3)
    }
}

impl RetryPolicy {
    /// `retries` additional attempts after the first one, no delay.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(cfg: &BackupConfig) -> Self {
        Self {
            delay: cfg.retry_delay(),
            ..Self::with_retries(cfg.download_retries)
        }
    }

    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            ErrorKind::Fatal => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::HttpStatus
            | ErrorKind::Corrupt => RetryDecision::RetryAfter(self.delay),
        }
    }
}
