//! Despesas CLI - Municipal expense history
//!
//! Usage:
//!   despesas themes --city campinas --year 2019
//!   despesas subthemes --city campinas --year 2019 --theme SAÚDE
//!   despesas history themes --city campinas --years 2016-2019 --theme SAÚDE
//!   despesas history subthemes --city campinas --years 2019,2020 --pair "SAÚDE::ATENÇÃO BÁSICA"
//!   despesas cache list

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use despesas_core::ArchiveCache;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(&cli)?;

    match cli.command {
        Commands::Themes { city, year } => {
            let source = commands::open_source(config, cli.offline)?;
            commands::cmd_themes(&source, &city, year).await
        }
        Commands::Subthemes { city, year, theme } => {
            let source = commands::open_source(config, cli.offline)?;
            commands::cmd_subthemes(&source, &city, year, &theme).await
        }
        Commands::History { kind } => {
            let source = commands::open_source(config, cli.offline)?;
            commands::cmd_history(&source, &kind).await
        }
        Commands::Cache { action } => {
            let cache = ArchiveCache::new(config.cache_dir);
            match action {
                None | Some(CacheAction::List) => commands::cmd_cache_list(&cache),
                Some(CacheAction::Clear { city, year }) => {
                    commands::cmd_cache_clear(&cache, city.as_deref(), year)
                }
            }
        }
    }
}
