use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{AdmissionGate, RateLimiter};
use crate::http_probe::prelude::*;

/// What the dispatcher got through before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub rounds_started: u32,
    pub tasks_spawned: usize,
    /// The run was cut short by cancellation.
    pub cancelled: bool,
}

/// Spawns one task per (round, URL) and waits for all of them.
///
/// Rounds are started `interval` apart without waiting for the previous
/// round to finish; only the admission gate and the rate limiter bound how
/// much work runs at once.
pub struct Dispatcher<P: ?Sized> {
    prober: Arc<P>,
    policy: RetryPolicy,
    gate: AdmissionGate,
    limiter: Arc<RateLimiter>,
    rounds: u32,
    interval: Duration,
}

impl<P> Dispatcher<P>
where
    P: Prober + ?Sized + 'static,
{
    pub fn new(
        prober: Arc<P>,
        policy: RetryPolicy,
        gate: AdmissionGate,
        limiter: RateLimiter,
        rounds: u32,
        interval: Duration,
    ) -> Self {
        Self {
            prober,
            policy,
            gate,
            limiter: Arc::new(limiter),
            rounds,
            interval,
        }
    }

    /// Run every round over `urls`, sending each task's result to `results`.
    /// `results` is dropped once the last task has finished, which tells the
    /// aggregator no more results will arrive.
    pub async fn run(
        self,
        urls: &[String],
        results: UnboundedSender<ProbeResult>,
        cancel: CancellationToken,
    ) -> DispatchReport {
        let mut tasks = JoinSet::new();
        let mut report = DispatchReport::default();

        'rounds: for round in 0..self.rounds {
            if cancel.is_cancelled() {
                break;
            }
            report.rounds_started += 1;
            log::debug!("starting round {}/{}", round + 1, self.rounds);

            for url in urls {
                if cancel.is_cancelled() {
                    break 'rounds;
                }
                tasks.spawn(run_task(
                    self.prober.clone(),
                    self.policy,
                    self.gate.clone(),
                    self.limiter.clone(),
                    url.clone(),
                    results.clone(),
                    cancel.clone(),
                ));
                report.tasks_spawned += 1;
            }

            if round + 1 < self.rounds {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'rounds,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                log::error!("probe task failed: {err}");
            }
        }
        drop(results);

        report.cancelled = cancel.is_cancelled();
        if report.cancelled {
            log::warn!(
                "run cancelled after {} of {} rounds",
                report.rounds_started,
                self.rounds
            );
        }
        report
    }
}

/// One (round, URL) task: rate token, then admission permit, then the probe.
/// Always sends exactly one result; the permit is held until it is sent.
async fn run_task<P>(
    prober: Arc<P>,
    policy: RetryPolicy,
    gate: AdmissionGate,
    limiter: Arc<RateLimiter>,
    url: String,
    results: UnboundedSender<ProbeResult>,
    cancel: CancellationToken,
) where
    P: Prober + ?Sized,
{
    let permit = match limiter.acquire(&cancel).await {
        Ok(()) => gate.admit(&cancel).await,
        Err(cancelled) => Err(cancelled),
    };

    let result = match &permit {
        Ok(_) => policy.run(&*prober, &url, &cancel).await,
        Err(_) => ProbeResult::cancelled(&url),
    };

    if results.send(result).is_err() {
        log::warn!("result for {url} dropped, nobody is collecting");
    }
    drop(permit);
}
