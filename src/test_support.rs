//! Test doubles: a local HTTP server and a scripted prober.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Local;
use http_body_util::Empty;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::http_probe::prelude::*;

/// What the server does with a request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    Status(u16),
    Delayed(u16, Duration),
    /// Abort the connection without answering.
    Drop,
}

pub(crate) struct TestServer {
    pub addr: SocketAddr,
    methods: Arc<Mutex<Vec<Method>>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Methods received so far, in arrival order.
    pub fn methods(&self) -> Vec<Method> {
        self.methods.lock().expect("methods lock").clone()
    }
}

pub(crate) async fn serve<F>(respond: F) -> TestServer
where
    F: Fn(&Method) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
    let addr = listener.local_addr().expect("test server address");
    let respond = Arc::new(respond);
    let methods = Arc::new(Mutex::new(Vec::new()));

    let seen = methods.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let respond = respond.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    seen.lock().expect("methods lock").push(req.method().clone());
                    let reply = (*respond)(req.method());
                    async move {
                        let status = match reply {
                            Reply::Status(code) => code,
                            Reply::Delayed(code, delay) => {
                                tokio::time::sleep(delay).await;
                                code
                            }
                            Reply::Drop => {
                                return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "dropped"));
                            }
                        };
                        Ok(Response::builder()
                            .status(status)
                            .body(Empty::<Bytes>::new())
                            .expect("test response"))
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    TestServer { addr, methods }
}

/// An address nothing listens on.
pub(crate) async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    format!("http://{addr}/")
}

/// What a [`ScriptedProber`] does on a given attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    /// Answer with a status after the given latency.
    Status(u16, Duration),
    /// Fail at the transport level after the given latency.
    Transport(Duration),
    /// Never answer; only cancellation ends the attempt.
    Hang,
}

type Script = dyn Fn(&str, usize) -> Step + Send + Sync;

/// A [`Prober`] that follows a script keyed by URL and 0-based attempt
/// number. Latencies use tokio time so paused-clock tests run instantly.
/// Reported durations are the scripted ones, not measured.
pub(crate) struct ScriptedProber {
    script: Box<Script>,
    attempts: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProber {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, usize) -> Step + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            attempts: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.attempts
            .lock()
            .expect("attempts lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().expect("attempts lock").values().sum()
    }

    /// Highest number of attempts that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str, cancel: &CancellationToken) -> ProbeResult {
        let attempt = {
            let mut attempts = self.attempts.lock().expect("attempts lock");
            let counter = attempts.entry(url.to_string()).or_insert(0);
            *counter += 1;
            *counter - 1
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let timestamp = Local::now();
        let step = (self.script)(url, attempt);
        let wait = match step {
            Step::Status(_, latency) | Step::Transport(latency) => latency,
            Step::Hang => Duration::MAX,
        };

        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match (finished, step) {
            (false, _) | (true, Step::Hang) => {
                ProbeResult::failure(url, ProbeError::Cancelled, Duration::ZERO, timestamp)
            }
            (true, Step::Status(code, latency)) => ProbeResult::response(url, code, latency, timestamp),
            (true, Step::Transport(latency)) => ProbeResult::failure(
                url,
                ProbeError::Transport("connection refused".to_string()),
                latency,
                timestamp,
            ),
        }
    }
}
