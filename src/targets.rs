//! Target list loading.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid URL {value:?}: {source}")]
    InvalidUrl {
        line: usize,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Parse one URL per line. Blank lines and `#` comments are skipped, and
/// entries without a scheme are assumed to be `https://`.
pub fn parse_targets(text: &str) -> Result<Vec<String>, TargetError> {
    let mut urls = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let url = if line.starts_with("http://") || line.starts_with("https://") {
            line.to_string()
        } else {
            format!("https://{line}")
        };

        Url::parse(&url).map_err(|source| TargetError::InvalidUrl {
            line: index + 1,
            value: line.to_string(),
            source,
        })?;
        urls.push(url);
    }

    Ok(urls)
}

pub fn load_targets(path: &Path) -> Result<Vec<String>, TargetError> {
    let text = std::fs::read_to_string(path).map_err(|source| TargetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_targets(&text)
}
