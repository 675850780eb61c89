//! Local cache of downloaded expense archives
//!
//! Archives are keyed by (city, year) and stored as
//! `expense_{city}_{year}.zip`. Entries are created on a miss and never
//! evicted; `clear` removes everything.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// An archive present in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedArchive {
    pub city: String,
    pub year: i32,
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Directory holding downloaded archives
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    dir: PathBuf,
}

impl ArchiveCache {
    /// Create a cache rooted at `dir`
    ///
    /// The directory is created lazily on the first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an archive for (city, year) is stored at
    pub fn path_for(&self, city: &str, year: i32) -> PathBuf {
        self.dir.join(file_name(city, year))
    }

    /// Cached archive path, if present
    pub fn get(&self, city: &str, year: i32) -> Option<PathBuf> {
        validate_city(city).ok()?;
        let path = self.path_for(city, year);
        path.is_file().then_some(path)
    }

    /// Store archive bytes for (city, year)
    ///
    /// Writes to a temp file in the cache dir first, so a failed download
    /// never leaves a truncated archive behind.
    pub fn store(&self, city: &str, year: i32, bytes: &[u8]) -> Result<PathBuf> {
        validate_city(city)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                Error::Config(format!(
                    "Failed to create cache directory {}: {}",
                    self.dir.display(),
                    e
                ))
            })?;
            info!("Created cache directory: {}", self.dir.display());
        }

        let dest = self.path_for(city, year);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&dest).map_err(|e| e.error)?;

        info!("Cached archive: {}", dest.display());
        Ok(dest)
    }

    /// List cached archives, sorted by city then year
    pub fn list(&self) -> Result<Vec<CachedArchive>> {
        let mut archives = Vec::new();

        if !self.dir.exists() {
            return Ok(archives);
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();

            let Some((city, year)) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_file_name)
            else {
                continue;
            };

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            archives.push(CachedArchive {
                city,
                year,
                path,
                size: metadata.len(),
            });
        }

        archives.sort_by(|a, b| a.city.cmp(&b.city).then(a.year.cmp(&b.year)));
        Ok(archives)
    }

    /// Remove one cached archive; returns whether it existed
    pub fn remove(&self, city: &str, year: i32) -> Result<bool> {
        validate_city(city)?;
        match self.get(city, year) {
            Some(path) => {
                fs::remove_file(&path)?;
                info!("Removed cached archive: {}", path.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every cached archive; returns how many were deleted
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for archive in self.list()? {
            if let Err(e) = fs::remove_file(&archive.path) {
                warn!("Failed to remove {}: {}", archive.path.display(), e);
                continue;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

/// Reject city slugs that can't be embedded in a file name or URL path
///
/// Portal slugs are letters, digits, `-` and `_`.
pub fn validate_city(city: &str) -> Result<()> {
    let valid = !city.is_empty()
        && city
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidCity(city.to_string()))
    }
}

fn file_name(city: &str, year: i32) -> String {
    format!("expense_{}_{}.zip", city, year)
}

/// Parse `expense_{city}_{year}.zip`; cities may contain underscores
fn parse_file_name(name: &str) -> Option<(String, i32)> {
    let stem = name.strip_prefix("expense_")?.strip_suffix(".zip")?;
    let (city, year) = stem.rsplit_once('_')?;
    if city.is_empty() {
        return None;
    }
    Some((city.to_string(), year.parse().ok()?))
}
