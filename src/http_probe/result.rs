use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;

/// Why an attempt produced no HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Connection, TLS or protocol failure. Carries the full source chain.
    #[error("{0}")]
    Transport(String),

    /// The per-attempt deadline elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The run was cancelled before or during the attempt.
    #[error("cancelled")]
    Cancelled,
}

/// Outcome of one task: the last attempt made against `url` in one round.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub url: String,

    /// `0` when no HTTP response was obtained.
    pub status_code: u16,

    /// Wall-clock time of the attempt, including the GET fallback if taken.
    pub duration: Duration,

    pub error: Option<ProbeError>,

    /// Start time of the attempt.
    pub timestamp: DateTime<Local>,
}

impl ProbeResult {
    pub fn response(url: &str, status_code: u16, duration: Duration, timestamp: DateTime<Local>) -> Self {
        Self {
            url: url.to_string(),
            status_code,
            duration,
            error: None,
            timestamp,
        }
    }

    pub fn failure(url: &str, error: ProbeError, duration: Duration, timestamp: DateTime<Local>) -> Self {
        Self {
            url: url.to_string(),
            status_code: 0,
            duration,
            error: Some(error),
            timestamp,
        }
    }

    /// A result for a task that observed cancellation without probing.
    pub fn cancelled(url: &str) -> Self {
        Self::failure(url, ProbeError::Cancelled, Duration::ZERO, Local::now())
    }

    /// Transport errors and 5xx responses earn another attempt.
    pub fn is_retryable_failure(&self) -> bool {
        self.error.is_some() || self.status_code >= 500
    }

    /// Aggregate success. The 400 threshold deliberately differs from the
    /// 500 retry threshold: a 4xx is not retried but still counts as failed.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (self.status_code == 0 || self.status_code < 400)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Some(ProbeError::Cancelled))
    }
}
