use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

pub const DEFAULT_CATALOG_ENDPOINT: &str = "https://app.ticketmaster.com/discovery/v2/events.json";
const DEFAULT_POOL_SIZE: usize = 4;
const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ticketmaster_api_key: Option<String>,
    pub ticketmaster_endpoint: String,
    pub database_path: Option<PathBuf>,
    pub pool_size: usize,
    pub default_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticketmaster_api_key: None,
            ticketmaster_endpoint: DEFAULT_CATALOG_ENDPOINT.to_string(),
            database_path: None,
            pool_size: DEFAULT_POOL_SIZE,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl AppConfig {
    /// Loads the config file at the default location and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&utils::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = read_config(path)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies `TICKETMASTER_*` / `EVENT_MONKEY_*` overrides resolved through `lookup`.
    /// Unparsable numeric overrides are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("TICKETMASTER_API_KEY").filter(|key| !key.trim().is_empty()) {
            self.ticketmaster_api_key = Some(key.trim().to_string());
        }
        if let Some(endpoint) = lookup("TICKETMASTER_ENDPOINT") {
            self.ticketmaster_endpoint = endpoint;
        }
        if let Some(path) = lookup("EVENT_MONKEY_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(size) = lookup("EVENT_MONKEY_POOL_SIZE").and_then(|s| s.parse().ok()) {
            self.pool_size = size;
        }
        if let Some(limit) = lookup("EVENT_MONKEY_DEFAULT_LIMIT").and_then(|s| s.parse().ok()) {
            self.default_limit = limit;
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        write_config(path, self)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
