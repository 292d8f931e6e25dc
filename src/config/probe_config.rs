use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::{ConfigError, parse_duration};

/// Optional YAML configuration. Every key may be omitted; command line
/// flags take precedence over anything set here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// File with URLs, one per line.
    pub urls: Option<PathBuf>,

    /// Maximum number of probes in flight at once.
    pub concurrency: Option<usize>,

    /// Requests per second, 0 for unlimited.
    pub rate: Option<u32>,

    /// Per-attempt deadline, e.g. "5s".
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub timeout: Option<Duration>,

    /// Number of probe rounds.
    pub count: Option<u32>,

    /// Pause between rounds, e.g. "2s".
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub interval: Option<Duration>,

    /// Extra attempts after a failed one.
    pub retries: Option<u32>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    pub user_agent: Option<String>,
}

impl FileConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawDuration>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawDuration::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawDuration::Text(text)) => parse_duration(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
