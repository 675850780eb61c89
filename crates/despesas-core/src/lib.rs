//! Despesas Core Library
//!
//! Historical summaries of municipal government spending:
//! - Record sources for yearly expense archives (TCE-SP portal, in-memory)
//! - Local archive cache keyed by (city, year)
//! - Aggregation of paid expenses by theme and subtheme
//! - Multi-year historical series for selected themes/subthemes
//! - CSV and JSON export of materialized series

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod series;
pub mod source;

/// Test utilities including mock archive server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{
    distinct_subthemes, distinct_themes, group_by_subtheme, group_by_theme,
    group_by_theme_and_subtheme, only_paid,
};
pub use config::SourceConfig;
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use models::{
    ExpenseRecord, ExpenseTable, PaymentStatus, ThemeSubthemeSummary, ThemeSummary, ThemeTotal,
};
pub use series::{
    all_subthemes_historical, subthemed_historical, themed_historical, DenseRow, DenseSeries,
    FillPolicy, HistoricalSeries, SeriesBuilder, SeriesRow,
};
pub use source::{ArchiveCache, CachedArchive, ExpenseSource, StaticSource, TceSource};
