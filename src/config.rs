use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://bioindex.hugeamp.org";
pub const DEFAULT_ORIGIN: &str = "https://cvd.hugeamp.org";
/// Above this many rows the association query's inline page is used even
/// when a continuation token is offered.
pub const DEFAULT_INLINE_COUNT_THRESHOLD: u64 = 10;
pub const DEFAULT_CONFIG_FILE: &str = "bioindex-fetch.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub inline_count_threshold: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub base_url: String,
    pub origin: String,
    pub inline_count_threshold: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            inline_count_threshold: DEFAULT_INLINE_COUNT_THRESHOLD,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the default file is optional.
    pub fn resolve(path: Option<&str>) -> Result<FetcherConfig, FetchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(FetcherConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FetchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| FetchError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> FetcherConfig {
        let defaults = FetcherConfig::default();
        FetcherConfig {
            base_url: config
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            origin: config.origin.unwrap_or(defaults.origin),
            inline_count_threshold: config
                .inline_count_threshold
                .unwrap_or(defaults.inline_count_threshold),
        }
    }
}
