//! Bounded retries with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::prelude::*;

const BASE_BACKOFF_MS: u64 = 100;

/// Runs up to `max_retries + 1` attempts and keeps the last result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the attempt following `attempt` (0-based):
    /// `100ms * 2^attempt` plus up to the same again in jitter.
    pub fn backoff(attempt: u32) -> Duration {
        Self::backoff_with(attempt, &mut rand::thread_rng())
    }

    pub fn backoff_with<R: Rng + ?Sized>(attempt: u32, rng: &mut R) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let base_ms = BASE_BACKOFF_MS.saturating_mul(factor);
        let jitter_ms = rng.gen_range(0..base_ms);
        Duration::from_millis(base_ms.saturating_add(jitter_ms))
    }

    /// Probe `url` until it answers with something other than a transport
    /// error or a 5xx, the attempts run out, or `cancel` fires.
    pub async fn run<P>(&self, prober: &P, url: &str, cancel: &CancellationToken) -> ProbeResult
    where
        P: Prober + ?Sized,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return ProbeResult::cancelled(url);
            }

            let result = prober.probe(url, cancel).await;
            if !result.is_retryable_failure() || result.is_cancelled() || attempt >= self.max_retries {
                return result;
            }

            let delay = Self::backoff(attempt);
            log::debug!(
                "{url} attempt {}/{} failed, retrying in {delay:?}",
                attempt + 1,
                self.max_attempts()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return ProbeResult::cancelled(url),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
