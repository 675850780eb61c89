//! Core command utilities
//!
//! This module contains:
//! - `load_config` - Resolve the source config, applying CLI flags last
//! - `open_source` - Build the TCE-SP record source
//! - `parse_years` / `parse_pair` - Parsing of history selections

use std::time::Duration;

use anyhow::{bail, Context, Result};
use despesas_core::{SourceConfig, TceSource};
use tracing::debug;

use crate::cli::Cli;

/// Load config layers (embedded, file, env) and apply the global flags
pub fn load_config(cli: &Cli) -> Result<SourceConfig> {
    let mut config =
        SourceConfig::load_from(cli.config.as_deref()).context("Failed to load source config")?;

    if let Some(ref url) = cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(ref dir) = cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            bail!("--timeout must be at least 1 second");
        }
        config.timeout = Duration::from_secs(secs);
    }

    debug!(
        "Source: {} (cache {}, timeout {}s)",
        config.base_url,
        config.cache_dir.display(),
        config.timeout.as_secs()
    );
    Ok(config)
}

pub fn open_source(config: SourceConfig, offline: bool) -> Result<TceSource> {
    let source = TceSource::new(config).context("Failed to set up the TCE-SP source")?;
    Ok(source.offline(offline))
}

/// Parse a year list such as `2019,2020` or `2016-2018,2020`
///
/// Order is preserved and duplicates are kept; the series has one row per
/// requested year.
pub fn parse_years(input: &str) -> Result<Vec<i32>> {
    let mut years = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((from, to)) => {
                let from: i32 = from
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid year in range: {}", part))?;
                let to: i32 = to
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid year in range: {}", part))?;
                if from > to {
                    bail!("Year range goes backwards: {}", part);
                }
                years.extend(from..=to);
            }
            None => {
                let year: i32 = part
                    .parse()
                    .with_context(|| format!("Invalid year: {}", part))?;
                years.push(year);
            }
        }
    }

    if years.is_empty() {
        bail!("No years given (use e.g. --years 2019,2020)");
    }
    Ok(years)
}

/// Parse a `THEME::SUBTHEME` pair
pub fn parse_pair(input: &str) -> Result<(String, String)> {
    let (theme, subtheme) = input
        .split_once("::")
        .with_context(|| format!("Invalid pair {:?} (use THEME::SUBTHEME)", input))?;
    let (theme, subtheme) = (theme.trim(), subtheme.trim());

    if theme.is_empty() || subtheme.is_empty() {
        bail!("Invalid pair {:?}: theme and subtheme must be non-empty", input);
    }
    Ok((theme.to_string(), subtheme.to_string()))
}
