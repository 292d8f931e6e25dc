//! Console lines for results and the final summary.

use std::fmt::Write;
use std::time::Duration;

use unicode_truncate::{Alignment, UnicodeTruncateStr};

use crate::http_probe::result::ProbeResult;
use crate::scheduler::DispatchReport;
use crate::stats::AggregateStats;

const MAX_URL_WIDTH: usize = 60;

/// Width of the URL column: the longest URL, capped.
pub fn url_width(urls: &[String]) -> usize {
    urls.iter()
        .map(|url| url.chars().count())
        .max()
        .unwrap_or(10)
        .min(MAX_URL_WIDTH)
}

/// One console line per result, with the URL cut or padded to `width`
/// display columns so the status column lines up.
pub fn format_result(result: &ProbeResult, width: usize) -> String {
    let when = result.timestamp.format("%H:%M:%S");
    let url = result.url.unicode_pad(width, Alignment::Left, true);
    match &result.error {
        None => {
            let mark = if result.is_success() { "✅" } else { "❌" };
            format!("[{when}] {mark} {url} {} in {:.2?}", result.status_code, result.duration)
        }
        Some(err) => format!("[{when}] ❌ {url} ERROR: {err}"),
    }
}

pub fn format_summary(stats: &AggregateStats, report: &DispatchReport, runtime: Duration) -> String {
    let mut out = String::from("---- summary ----\n");
    let _ = writeln!(
        out,
        "requests: {}, success: {}, failed: {}",
        stats.total, stats.success_count, stats.failed_count
    );
    if let (Some(min), Some(max)) = (stats.min_latency, stats.max_latency) {
        let _ = writeln!(
            out,
            "avg latency: {:.2?}, min: {:.2?}, max: {:.2?}",
            stats.average_latency(),
            min,
            max
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "interrupted after {} round(s)", report.rounds_started);
    }
    let _ = write!(out, "total runtime: {:.2?}", runtime);
    out
}
