//! Running totals over completed probe results.
//!
//! All mutation happens in [`aggregate`], the single consumer of the result
//! channel, so the counters need no locking.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::http_probe::result::ProbeResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total: u64,
    pub success_count: u64,
    pub failed_count: u64,

    /// Latency figures cover only results that obtained an HTTP response.
    pub sum_latency: Duration,
    pub min_latency: Option<Duration>,
    pub max_latency: Option<Duration>,
}

impl AggregateStats {
    pub fn record(&mut self, result: &ProbeResult) {
        self.total += 1;
        if result.is_success() {
            self.success_count += 1;
        } else {
            self.failed_count += 1;
        }

        if result.error.is_none() {
            let latency = result.duration;
            self.sum_latency = self.sum_latency.saturating_add(latency);
            self.min_latency = Some(self.min_latency.map_or(latency, |min| min.min(latency)));
            self.max_latency = Some(self.max_latency.map_or(latency, |max| max.max(latency)));
        }
    }

    /// Summed response latency spread over every recorded result, failures
    /// included. Zero until some response latency has been recorded.
    pub fn average_latency(&self) -> Duration {
        if self.total == 0 || self.sum_latency.is_zero() {
            return Duration::ZERO;
        }
        let nanos = self.sum_latency.as_nanos() / u128::from(self.total);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Drain `results` until every sender is gone, folding each result into the
/// totals and then handing it to `on_result`.
pub async fn aggregate<F>(mut results: UnboundedReceiver<ProbeResult>, mut on_result: F) -> AggregateStats
where
    F: FnMut(ProbeResult),
{
    let mut stats = AggregateStats::default();
    while let Some(result) = results.recv().await {
        stats.record(&result);
        on_result(result);
    }
    stats
}
