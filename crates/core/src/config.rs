//! Config file parsing for `~/.config/douban-metadata/config.toml`.
//!
//! The only setting the Douban source strictly needs is the API key; the rest
//! exist so the endpoint can be pointed at a mirror or a test server.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::douban::endpoint::{DEFAULT_BASE_URL, DEFAULT_SEARCH_COUNT};
use crate::error::ConfigError;
use crate::lookup::DEFAULT_TIMEOUT;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub douban: DoubanConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubanConfig {
    #[serde(default)]
    pub apikey: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_count")]
    pub search_count: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_search_count() -> u32 {
    DEFAULT_SEARCH_COUNT
}

impl Default for DoubanConfig {
    fn default() -> Self {
        Self {
            apikey: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            search_count: default_search_count(),
        }
    }
}

/// Load config from the default path. Missing or unreadable config yields defaults.
pub fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config at {}: {}", path.display(), e);
            AppConfig::default()
        }),
        None => AppConfig::default(),
    }
}

/// Load config from `path`. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(e.into()),
    };
    Ok(toml::from_str::<AppConfig>(&content)?)
}

pub fn save_config_to(cfg: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("douban-metadata");
        p.push("config.toml");
        p
    })
}

/// Set a dot-separated key such as `douban.apikey`.
pub fn set_config_key(cfg: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = key.splitn(2, '.').collect();
    match parts.as_slice() {
        ["douban", sub] => match *sub {
            "apikey" => cfg.douban.apikey = value.to_string(),
            "base_url" => cfg.douban.base_url = value.to_string(),
            "timeout_secs" => cfg.douban.timeout_secs = parse_value(key, value)?,
            "search_count" => cfg.douban.search_count = parse_value(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        },
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }
    Ok(())
}

fn parse_value<V: std::str::FromStr>(key: &str, value: &str) -> Result<V, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
