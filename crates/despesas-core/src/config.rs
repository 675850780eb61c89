//! Record source configuration
//!
//! ## Configuration Resolution
//!
//! Values are resolved in layers, later layers winning:
//! 1. Embedded defaults (compiled into binary)
//! 2. Override file (~/.local/share/despesas/config/source.toml, or an explicit path)
//! 3. Environment variables (`DESPESAS_BASE_URL`, `DESPESAS_CACHE_DIR`, `DESPESAS_TIMEOUT_SECS`)
//!
//! The CLI applies its own flags on top of the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/source.toml");

/// Configuration for downloading and caching expense archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// URL prefix the yearly archives live under
    pub base_url: String,
    /// Directory for downloaded archives
    pub cache_dir: PathBuf,
    /// Timeout for a whole archive download
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://transparencia.tce.sp.gov.br/sites/default/files/csv".to_string(),
            cache_dir: default_cache_dir(),
            timeout: Duration::from_secs(120),
            user_agent: format!("despesas/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SourceConfig {
    /// Load embedded defaults plus the default override file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an explicit override file
    ///
    /// An explicit path that doesn't exist is an error; the default override
    /// location is optional.
    pub fn load_from(override_path: Option<&Path>) -> Result<Self> {
        let mut config = parse_config(DEFAULT_CONFIG, SourceConfig::default())?;

        match override_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                config = parse_config(&content, config)?;
                debug!("Loaded source config from {}", path.display());
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.exists()) {
                    let content = fs::read_to_string(&path).map_err(|e| {
                        Error::Config(format!("Failed to read {}: {}", path.display(), e))
                    })?;
                    config = parse_config(&content, config)?;
                    debug!("Loaded source config from {}", path.display());
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DESPESAS_BASE_URL") {
            self.base_url = url;
        }
        if let Some(dir) = lookup("DESPESAS_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("DESPESAS_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("DESPESAS_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Archive URL for a (city, year)
    pub fn archive_url(&self, city: &str, year: i32) -> String {
        format!(
            "{}/despesas-{}-{}.zip",
            self.base_url.trim_end_matches('/'),
            city,
            year
        )
    }
}

/// Default override file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("despesas").join("config").join("source.toml"))
}

/// Default archive cache directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("despesas")
        .join("archives")
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    source: Option<RawSource>,
    cache: Option<RawCache>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCache {
    dir: Option<PathBuf>,
}

/// Parse TOML content on top of `base`
fn parse_config(content: &str, base: SourceConfig) -> Result<SourceConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = base;

    if let Some(source) = raw.source {
        if let Some(url) = source.base_url {
            config.base_url = url;
        }
        if let Some(secs) = source.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = source.user_agent {
            config.user_agent = agent;
        }
    }

    if let Some(dir) = raw.cache.and_then(|c| c.dir) {
        config.cache_dir = dir;
    }

    if config.base_url.trim().is_empty() {
        return Err(Error::Config("base_url must not be empty".into()));
    }

    Ok(config)
}
