use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::model::Settings;
use super::probe_config::FileConfig;
use super::{ConfigError, parse_duration};

/// Command line flags. Anything left unset falls back to the YAML file,
/// then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "oxyping", version, about = "Probe a list of URLs over HTTP and report latency")]
pub struct Cli {
    /// YAML config file
    #[arg(long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// File with URLs (one per line). Lines starting with # are ignored
    #[arg(long)]
    pub urls: Option<PathBuf>,

    /// Max concurrent requests [default: 50]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Rate limit in requests per second, 0 = unlimited [default: 0]
    #[arg(long)]
    pub rate: Option<u32>,

    /// HTTP request timeout, e.g. 5s or 800ms [default: 5s]
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// How many pings per URL [default: 1]
    #[arg(long)]
    pub count: Option<u32>,

    /// Interval between ping rounds [default: 2s]
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Retries on failure, per request [default: 2]
    #[arg(long)]
    pub retries: Option<u32>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// User-Agent header sent with every probe
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl Settings {
    /// Merge flags over the file over the defaults, then validate.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let settings = Settings {
            urls_file: cli.urls.clone().or(file.urls).unwrap_or(defaults.urls_file),
            concurrency: cli.concurrency.or(file.concurrency).unwrap_or(defaults.concurrency),
            rate: cli.rate.or(file.rate).unwrap_or(defaults.rate),
            timeout: cli.timeout.or(file.timeout).unwrap_or(defaults.timeout),
            count: cli.count.or(file.count).unwrap_or(defaults.count),
            interval: cli.interval.or(file.interval).unwrap_or(defaults.interval),
            retries: cli.retries.or(file.retries).unwrap_or(defaults.retries),
            insecure: cli.insecure || file.insecure.unwrap_or(defaults.insecure),
            user_agent: cli
                .user_agent
                .clone()
                .or(file.user_agent)
                .unwrap_or(defaults.user_agent),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.count == 0 {
            return Err(ConfigError::Invalid {
                field: "count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Load the run configuration from the command line and, when one is named
/// through `--config` or `CONFIG_FILE`, a YAML file.
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let file = match &cli.config {
        Some(path) => {
            log::info!("Using config file: {}", path.display());
            FileConfig::load(path)?
        }
        None => FileConfig::default(),
    };

    Settings::resolve(cli, file)
}
