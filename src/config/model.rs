use std::path::PathBuf;
use std::time::Duration;

/// Fully resolved, validated run configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub urls_file: PathBuf,
    pub concurrency: usize,
    /// Requests per second; 0 disables rate limiting.
    pub rate: u32,
    pub timeout: Duration,
    pub count: u32,
    pub interval: Duration,
    pub retries: u32,
    pub insecure: bool,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            urls_file: PathBuf::from("urls.txt"),
            concurrency: 50,
            rate: 0,
            timeout: Duration::from_secs(5),
            count: 1,
            interval: Duration::from_secs(2),
            retries: 2,
            insecure: false,
            user_agent: format!("oxyping/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
