//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use despesas_core::{ExportFormat, FillPolicy};

/// Despesas - Historical spending of São Paulo municipalities
#[derive(Parser)]
#[command(name = "despesas")]
#[command(about = "Municipal expense history from TCE-SP open data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Source config override file
    ///
    /// Defaults to ~/.local/share/despesas/config/source.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for downloaded archives
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// URL prefix the yearly archives are downloaded from
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Download timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Only use archives already in the cache
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Paid totals per theme for one year
    Themes {
        /// Municipality slug as used by the portal (e.g. campinas)
        #[arg(short, long)]
        city: String,

        /// Fiscal year
        #[arg(short, long)]
        year: i32,
    },

    /// Paid totals per subtheme of one theme for one year
    Subthemes {
        /// Municipality slug as used by the portal
        #[arg(short, long)]
        city: String,

        /// Fiscal year
        #[arg(short, long)]
        year: i32,

        /// Theme to break down
        #[arg(short, long)]
        theme: String,
    },

    /// Build a multi-year series
    History {
        #[command(subcommand)]
        kind: HistoryKind,
    },

    /// Manage the archive cache
    Cache {
        #[command(subcommand)]
        action: Option<CacheAction>,
    },
}

/// Options shared by every history series
#[derive(Args, Clone, Debug)]
pub struct SeriesArgs {
    /// Municipality slug as used by the portal
    #[arg(short, long)]
    pub city: String,

    /// Years in output order: comma separated, ranges allowed (2018-2020,2022)
    #[arg(short, long)]
    pub years: String,

    /// Cell value when a column is missing in a year: error, zero, null
    #[arg(long, default_value = "null")]
    pub fill: FillPolicy,

    /// Output format: table, csv, json
    #[arg(short, long, default_value = "table")]
    pub format: ExportFormat,
}

#[derive(Subcommand)]
pub enum HistoryKind {
    /// One column per theme
    Themes {
        #[command(flatten)]
        series: SeriesArgs,

        /// Theme to include (repeatable)
        #[arg(short, long = "theme", required = true)]
        themes: Vec<String>,
    },

    /// One column per theme/subtheme pair
    Subthemes {
        #[command(flatten)]
        series: SeriesArgs,

        /// Pair to include as "THEME::SUBTHEME" (repeatable)
        #[arg(short, long = "pair", required = true)]
        pairs: Vec<String>,
    },

    /// Every subtheme found under the given themes, year by year
    AllSubthemes {
        #[command(flatten)]
        series: SeriesArgs,

        /// Theme to expand (repeatable)
        #[arg(short, long = "theme", required = true)]
        themes: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached archives
    List,

    /// Remove cached archives
    Clear {
        /// Only remove this city's archive (requires --year)
        #[arg(long, requires = "year")]
        city: Option<String>,

        /// Year of the archive to remove
        #[arg(long, requires = "city")]
        year: Option<i32>,
    },
}
