//! Round scheduling and admission control.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::http_probe::prelude::*;
use crate::stats::{self, AggregateStats};

pub mod admission;
pub mod dispatcher;
pub mod rate_limiter;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use rate_limiter::RateLimiter;

/// A wait was abandoned because the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Final outcome of a whole run.
#[derive(Debug, Clone)]
pub struct ProbeRun {
    pub stats: AggregateStats,
    pub report: DispatchReport,
}

/// Probe every URL `settings.count` times, handing each result to
/// `on_result` as it completes. Returns once every task has finished and
/// every result has been aggregated, including after cancellation.
pub async fn run_probes<P, F>(
    settings: &Settings,
    urls: &[String],
    prober: Arc<P>,
    cancel: CancellationToken,
    on_result: F,
) -> ProbeRun
where
    P: Prober + ?Sized + 'static,
    F: FnMut(ProbeResult),
{
    let (tx, rx) = mpsc::unbounded_channel();

    let gate = AdmissionGate::new(settings.concurrency);
    let limiter = RateLimiter::start(settings.rate, cancel.clone());
    log::info!(
        "probing {} url(s) x {} round(s), concurrency {}, rate limit {}",
        urls.len(),
        settings.count,
        gate.capacity(),
        if limiter.is_enabled() { format!("{}/s", settings.rate) } else { "off".to_string() },
    );

    let dispatcher = Dispatcher::new(
        prober,
        RetryPolicy::new(settings.retries),
        gate,
        limiter,
        settings.count,
        settings.interval,
    );

    let (report, stats) = tokio::join!(
        dispatcher.run(urls, tx, cancel),
        stats::aggregate(rx, on_result),
    );

    ProbeRun { stats, report }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{Reply, ScriptedProber, Step, refused_url, serve};

    fn settings(concurrency: usize, count: u32, retries: u32) -> Settings {
        Settings {
            concurrency,
            count,
            retries,
            rate: 0,
            interval: Duration::ZERO,
            ..Settings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_healthy_and_one_unreachable_target() {
        let prober = Arc::new(ScriptedProber::new(|url, _| {
            if url == "A" {
                Step::Status(200, Duration::from_millis(10))
            } else {
                Step::Transport(Duration::from_millis(3))
            }
        }));
        let urls = vec!["A".to_string(), "B".to_string()];
        let mut seen = Vec::new();

        let run = run_probes(&settings(2, 1, 0), &urls, prober.clone(), CancellationToken::new(), |r| {
            seen.push(r)
        })
        .await;

        assert_eq!(seen.len(), 2);
        assert_eq!(run.stats.total, 2);
        assert_eq!(run.stats.success_count, 1);
        assert_eq!(run.stats.failed_count, 1);
        assert_eq!(run.stats.min_latency, Some(Duration::from_millis(10)));
        assert_eq!(run.stats.max_latency, Some(Duration::from_millis(10)));
        // 10ms of response latency spread over both results.
        assert_eq!(run.stats.average_latency(), Duration::from_millis(5));
        assert_eq!(prober.attempts("B"), 1);
        assert!(!run.report.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_is_not_retried_but_counts_as_failed() {
        let prober = Arc::new(ScriptedProber::new(|_, _| Step::Status(430, Duration::from_millis(7))));
        let urls = vec!["https://limited.test/".to_string()];

        let run = run_probes(&settings(1, 1, 3), &urls, prober.clone(), CancellationToken::new(), |_| {})
            .await;

        assert_eq!(prober.attempts(&urls[0]), 1);
        assert_eq!(run.stats.total, 1);
        assert_eq!(run.stats.failed_count, 1);
        assert_eq!(run.stats.success_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_run_still_summarises_collected_results() {
        let prober = Arc::new(ScriptedProber::new(|_, _| Step::Status(200, Duration::from_millis(20))));
        let urls = vec!["https://a.test/".to_string(), "https://b.test/".to_string()];
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });
        let settings = Settings {
            interval: Duration::from_secs(1),
            ..settings(4, 10, 0)
        };

        let run = run_probes(&settings, &urls, prober, cancel, |_| {}).await;

        assert!(run.report.cancelled);
        assert_eq!(run.report.rounds_started, 3);
        assert_eq!(run.stats.total, 6);
        assert_eq!(run.stats.total, run.stats.success_count + run.stats.failed_count);
    }

    #[tokio::test]
    async fn probes_real_http_endpoints() {
        let server = serve(|_| Reply::Status(204)).await;
        let urls = vec![server.url(), refused_url().await];
        let settings = settings(2, 1, 0);
        let client = build_client(&settings).expect("client");

        let run = run_probes(
            &settings,
            &urls,
            Arc::new(HttpProber::new(client)),
            CancellationToken::new(),
            |_| {},
        )
        .await;

        assert_eq!(run.stats.total, 2);
        assert_eq!(run.stats.success_count, 1);
        assert_eq!(run.stats.failed_count, 1);
        assert!(run.stats.min_latency.is_some());
        assert_eq!(run.stats.min_latency, run.stats.max_latency);
    }
}
