use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use oxyping::config::{Cli, load_settings};
use oxyping::http_probe::prelude::*;
use oxyping::report::{format_result, format_summary, url_width};
use oxyping::scheduler::run_probes;
use oxyping::shutdown::spawn_signal_listener;
use oxyping::targets::load_targets;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = load_settings(&cli).context("invalid configuration")?;

    let urls = load_targets(&settings.urls_file).context("failed to load urls")?;
    if urls.is_empty() {
        bail!("no urls provided");
    }

    log::info!(
        "Probing {} url(s), {} round(s), concurrency {}, rate {}/s, {} retries",
        urls.len(),
        settings.count,
        settings.concurrency,
        settings.rate,
        settings.retries
    );

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let client = build_client(&settings).context("failed to build HTTP client")?;
    let prober = Arc::new(HttpProber::new(client));
    let width = url_width(&urls);

    let started = Instant::now();
    let run = run_probes(&settings, &urls, prober, cancel.clone(), |result| {
        println!("{}", format_result(&result, width));
    })
    .await;
    cancel.cancel();

    println!("{}", format_summary(&run.stats, &run.report, started.elapsed()));
    Ok(())
}
