//! Record sources
//!
//! A record source yields every expense line for one (city, year), with
//! amounts already normalized to `Decimal`. The aggregation code only ever
//! talks to the `ExpenseSource` trait.
//!
//! # Implementations
//!
//! - `TceSource`: downloads yearly archives from the TCE-SP transparency
//!   portal, caching them on disk
//! - `StaticSource`: in-memory records, for tests and offline work

mod archive;
mod cache;
mod tce;

pub use archive::{parse_expense_csv, read_archive};
pub use cache::{validate_city, ArchiveCache, CachedArchive};
pub use tce::TceSource;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ExpenseRecord, ExpenseTable};

/// Anything that can produce the expense table of a (city, year)
///
/// Implementations report `SourceUnavailable` when the remote can't be
/// reached, `Parse` for malformed data and `NotFound` when the city/year has
/// no published data.
#[async_trait]
pub trait ExpenseSource: Send + Sync {
    /// Fetch every expense line for the city and year, regardless of status
    async fn fetch(&self, city: &str, year: i32) -> Result<ExpenseTable>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// In-memory record source
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tables: HashMap<(String, i32), Vec<ExpenseRecord>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the records for a city and year
    pub fn with_year(
        mut self,
        city: impl Into<String>,
        year: i32,
        records: Vec<ExpenseRecord>,
    ) -> Self {
        self.insert(city, year, records);
        self
    }

    pub fn insert(&mut self, city: impl Into<String>, year: i32, records: Vec<ExpenseRecord>) {
        self.tables.insert((city.into(), year), records);
    }
}

#[async_trait]
impl ExpenseSource for StaticSource {
    async fn fetch(&self, city: &str, year: i32) -> Result<ExpenseTable> {
        self.tables
            .get(&(city.to_string(), year))
            .map(|records| ExpenseTable::new(city, year, records.clone()))
            .ok_or_else(|| Error::NotFound {
                city: city.to_string(),
                year,
            })
    }

    fn name(&self) -> &str {
        "static"
    }
}
