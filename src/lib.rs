//! Bounded-concurrency HTTP liveness probing.
//!
//! URLs are probed over several timed rounds. Each (round, URL) task waits
//! for a rate token and an admission permit, probes with retries, and sends
//! its result to a single aggregator. One cancellation token reaches every
//! point where a task can wait.

pub mod config;
pub mod http_probe;
pub mod report;
pub mod scheduler;
pub mod shutdown;
pub mod stats;
pub mod targets;

#[cfg(test)]
mod test_support;
