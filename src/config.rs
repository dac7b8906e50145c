use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "housing-filters.toml";

/// REST backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            user_agent: concat!("housing-filters/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
}

impl Config {
    /// Load from `path` (or `housing-filters.toml` in the working directory),
    /// then apply `HOUSING_API_URL` / `HOUSING_API_TIMEOUT`. A missing file
    /// yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            info!("{} not found, using defaults", path.display());
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override values from environment lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("HOUSING_API_URL").filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(raw) = lookup("HOUSING_API_TIMEOUT") {
            match raw.parse() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(e) => warn!("Invalid HOUSING_API_TIMEOUT value {:?}: {}", raw, e),
            }
        }
    }
}
