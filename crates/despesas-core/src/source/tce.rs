//! TCE-SP transparency portal source
//!
//! Downloads `despesas-{city}-{year}.zip` from the portal, keeps it in the
//! archive cache and parses the table inside. A cached archive is always
//! preferred over the network.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::archive::read_archive;
use super::cache::{validate_city, ArchiveCache};
use super::ExpenseSource;
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::models::{ExpenseRecord, ExpenseTable};

/// Record source backed by the TCE-SP portal
#[derive(Debug, Clone)]
pub struct TceSource {
    http_client: Client,
    config: SourceConfig,
    cache: ArchiveCache,
    /// Never hit the network; only cached archives are served
    offline: bool,
}

impl TceSource {
    /// Create a source from configuration
    pub fn new(config: SourceConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            cache: ArchiveCache::new(config.cache_dir.clone()),
            config,
            offline: false,
        })
    }

    /// Serve only archives that are already cached
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Download the archive bytes for (city, year)
    async fn download(&self, city: &str, year: i32) -> Result<Vec<u8>> {
        let url = self.config.archive_url(city, year);
        info!("Downloading {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unavailable(city, year, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(Error::NotFound {
                    city: city.to_string(),
                    year,
                })
            }
            status if !status.is_success() => {
                return Err(Error::SourceUnavailable {
                    city: city.to_string(),
                    year,
                    reason: format!("HTTP {} from {}", status, url),
                })
            }
            _ => {}
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.unavailable(city, year, e))?;

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    fn unavailable(&self, city: &str, year: i32, err: reqwest::Error) -> Error {
        let reason = if err.is_timeout() {
            format!("timed out after {}s", self.config.timeout.as_secs())
        } else {
            err.to_string()
        };
        Error::SourceUnavailable {
            city: city.to_string(),
            year,
            reason,
        }
    }
}

/// Open and parse a cached archive; an unreadable file is a parse failure
fn open_archive(path: &Path) -> Result<Vec<ExpenseRecord>> {
    let file = File::open(path).map_err(|e| {
        Error::Parse(format!("Cannot open archive {}: {}", path.display(), e))
    })?;
    read_archive(BufReader::new(file))
}

#[async_trait]
impl ExpenseSource for TceSource {
    async fn fetch(&self, city: &str, year: i32) -> Result<ExpenseTable> {
        validate_city(city)?;

        let (path, downloaded) = match self.cache.get(city, year) {
            Some(path) => {
                debug!("Cache hit for {}/{}: {}", city, year, path.display());
                (path, false)
            }
            None if self.offline => {
                return Err(Error::SourceUnavailable {
                    city: city.to_string(),
                    year,
                    reason: "offline and not cached".to_string(),
                })
            }
            None => {
                let bytes = self.download(city, year).await?;
                (self.cache.store(city, year, &bytes)?, true)
            }
        };

        let records = match open_archive(&path) {
            Ok(records) => records,
            Err(e) => {
                // Don't keep a freshly downloaded archive we can't read
                if downloaded {
                    if let Err(remove_err) = self.cache.remove(city, year) {
                        warn!(
                            "Failed to drop unreadable archive {}: {}",
                            path.display(),
                            remove_err
                        );
                    }
                }
                return Err(e);
            }
        };
        info!("Loaded {} expense lines for {}/{}", records.len(), city, year);

        Ok(ExpenseTable::new(city, year, records))
    }

    fn name(&self) -> &str {
        "tce-sp"
    }
}
