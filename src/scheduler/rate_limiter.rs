//! Leaky token buffer driven by a ticker.
//!
//! A background task deposits one token every `1/rate` seconds into a buffer
//! holding at most `2 * rate` tokens. Deposits never block; a tick that finds
//! the buffer full is dropped, so idle periods only bank a short burst.

use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Cancelled;

#[derive(Debug)]
pub struct RateLimiter {
    tokens: Option<Mutex<mpsc::Receiver<()>>>,
}

impl RateLimiter {
    /// A limiter that admits everything immediately.
    pub fn unlimited() -> Self {
        Self { tokens: None }
    }

    /// Start a limiter issuing roughly `rate` tokens per second; `0` yields
    /// [`RateLimiter::unlimited`]. Must be called inside a tokio runtime.
    /// The ticker stops when `cancel` fires or the limiter is dropped.
    pub fn start(rate: u32, cancel: CancellationToken) -> Self {
        if rate == 0 {
            return Self::unlimited();
        }

        let capacity = (rate as usize).saturating_mul(2);
        let period = (Duration::from_secs(1) / rate).max(Duration::from_nanos(1));
        let (tx, rx) = mpsc::channel(capacity);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match tx.try_send(()) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(())) => {
                            log::trace!("rate limiter buffer full, dropping tick");
                        }
                        Err(mpsc::error::TrySendError::Closed(())) => break,
                    },
                }
            }
        });

        Self {
            tokens: Some(Mutex::new(rx)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tokens.is_some()
    }

    /// Wait for one token, or for cancellation, whichever comes first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let Some(tokens) = &self.tokens else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            token = async { tokens.lock().await.recv().await } => token.ok_or(Cancelled),
        }
    }

    /// Take a token if one is ready right now.
    #[cfg(test)]
    pub(crate) fn try_acquire(&self) -> bool {
        match &self.tokens {
            None => true,
            Some(tokens) => tokens
                .try_lock()
                .is_ok_and(|mut rx| rx.try_recv().is_ok()),
        }
    }
}
