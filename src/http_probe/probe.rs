use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Local;
use reqwest::{Client, Method};
use tokio_util::sync::CancellationToken;

use super::prelude::*;
use super::error_chain;
use crate::config::Settings;

/// One attempt against one URL.
///
/// Implementations must never fail: every outcome, including cancellation,
/// is expressed as a [`ProbeResult`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, cancel: &CancellationToken) -> ProbeResult;
}

/// Build the client shared by every probe. Connections are pooled and reused
/// across tasks and rounds.
pub fn build_client(settings: &Settings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(100)
        .danger_accept_invalid_certs(settings.insecure)
        .user_agent(settings.user_agent.as_str())
        .build()
}

/// Probes with a HEAD request, falling back to GET when HEAD fails at the
/// transport level.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send one request and return its status. The response is dropped
    /// before returning so the connection goes back to the pool.
    async fn send(&self, method: Method, url: &str, cancel: &CancellationToken) -> Result<u16, ProbeError> {
        let request = self.client.request(method, url).send();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            response = request => match response {
                Ok(response) => Ok(response.status().as_u16()),
                Err(err) if err.is_timeout() => Err(ProbeError::Timeout),
                Err(err) => Err(ProbeError::Transport(error_chain(&err))),
            },
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, cancel: &CancellationToken) -> ProbeResult {
        let timestamp = Local::now();
        let start = Instant::now();

        let outcome = match self.send(Method::HEAD, url, cancel).await {
            Err(ProbeError::Cancelled) => Err(ProbeError::Cancelled),
            Err(err) => {
                log::debug!("HEAD {url} failed ({err}), retrying with GET");
                self.send(Method::GET, url, cancel).await
            }
            ok => ok,
        };
        let duration = start.elapsed();

        match outcome {
            Ok(status) => {
                log::debug!("{url} answered {status} in {duration:?}");
                ProbeResult::response(url, status, duration, timestamp)
            }
            Err(error) => {
                log::debug!("{url} failed after {duration:?}: {error}");
                ProbeResult::failure(url, error, duration, timestamp)
            }
        }
    }
}
