//! Historical series of paid expense totals
//!
//! A series has one row per requested year, in the order the years were
//! given (duplicates included). Each row maps column keys to the total paid
//! amount of a selection that year:
//!
//! - theme → `vl_despesa_{theme}`
//! - (theme, subtheme) → `vl_despesa_{theme}_{subtheme}`
//!
//! Rows are sparse: when subthemes are discovered per year, different rows
//! can carry different columns. `HistoricalSeries::to_dense` lines them up
//! under an explicit `FillPolicy`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{
    distinct_subthemes, group_by_theme, group_by_theme_and_subtheme, only_paid,
};
use crate::error::{Error, Result};
use crate::models::ExpenseTable;
use crate::source::ExpenseSource;

/// Prefix shared by every column key
pub const COLUMN_PREFIX: &str = "vl_despesa";

/// Column key for a theme
pub fn theme_column(theme: &str) -> String {
    format!("{}_{}", COLUMN_PREFIX, theme)
}

/// Column key for a (theme, subtheme) pair
///
/// Keys are not injective: ("A_B", "C") and ("A", "B_C") share a key. The
/// series builders reject selections that collide within a row.
pub fn subtheme_column(theme: &str, subtheme: &str) -> String {
    format!("{}_{}_{}", COLUMN_PREFIX, theme, subtheme)
}

/// Which selection produced each column of a row
#[derive(Default)]
struct ColumnOwners {
    owners: HashMap<String, (String, Option<String>)>,
}

impl ColumnOwners {
    /// Claim `column` for a selection; repeating the same selection is fine
    fn claim(&mut self, column: &str, theme: &str, subtheme: Option<&str>) -> Result<()> {
        let owner = (theme.to_string(), subtheme.map(str::to_string));
        match self.owners.get(column) {
            Some(existing) if *existing != owner => Err(Error::DuplicateColumn {
                column: column.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(column.to_string(), owner);
                Ok(())
            }
        }
    }
}

/// One year of a historical series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRow {
    pub year: i32,
    /// Column key → total, in insertion order
    cells: Vec<(String, Decimal)>,
}

impl SeriesRow {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            cells: Vec::new(),
        }
    }

    /// Set a cell, replacing an existing value for the same column
    pub fn set(&mut self, column: String, value: Decimal) {
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<Decimal> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| *v)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Sparse table of totals indexed by year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalSeries {
    pub city: String,
    rows: Vec<SeriesRow>,
}

impl HistoricalSeries {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SeriesRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    /// Row index, i.e. the requested years in request order
    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of all column keys, in first-seen order
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for (column, _) in row.cells() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        columns
    }

    /// Values of one column, one entry per row
    pub fn column(&self, column: &str) -> Vec<Option<Decimal>> {
        self.rows.iter().map(|r| r.get(column)).collect()
    }

    /// Line rows up under the union of columns
    pub fn to_dense(&self, fill: FillPolicy) -> Result<DenseSeries> {
        let columns = self.columns();
        let mut rows = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            let values = columns
                .iter()
                .map(|column| match (row.get(column), fill) {
                    (Some(value), _) => Ok(Some(value)),
                    (None, FillPolicy::Zero) => Ok(Some(Decimal::ZERO)),
                    (None, FillPolicy::Null) => Ok(None),
                    (None, FillPolicy::Error) => Err(Error::MissingCell {
                        year: row.year,
                        column: column.clone(),
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(DenseRow {
                year: row.year,
                values,
            });
        }

        Ok(DenseSeries { columns, rows })
    }
}

/// What to put in a cell whose column didn't exist that year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Fail materialization
    Error,
    /// Write zero
    Zero,
    /// Leave the cell empty
    #[default]
    Null,
}

impl FillPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Zero => "zero",
            Self::Null => "null",
        }
    }
}

impl std::str::FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "zero" => Ok(Self::Zero),
            "null" | "empty" => Ok(Self::Null),
            _ => Err(format!(
                "Unknown fill policy: {} (valid: error, zero, null)",
                s
            )),
        }
    }
}

/// A materialized series: fixed columns, one value slot per column per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenseSeries {
    pub columns: Vec<String>,
    pub rows: Vec<DenseRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenseRow {
    pub year: i32,
    pub values: Vec<Option<Decimal>>,
}

/// Builds historical series by fetching each year from a record source
///
/// Years are processed one at a time, in order. Any failure (fetch, or a
/// selection absent from a year) aborts the whole series; the error carries
/// the city and year it happened in.
pub struct SeriesBuilder<'a, S: ExpenseSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ExpenseSource + ?Sized> SeriesBuilder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// One column per theme: the theme's total paid amount
    pub async fn themed_historical<T: AsRef<str>>(
        &self,
        city: &str,
        years: &[i32],
        themes: &[T],
    ) -> Result<HistoricalSeries> {
        self.collect(city, years, |paid, row| {
            let summary = group_by_theme(paid)?;
            let mut owners = ColumnOwners::default();
            for theme in themes {
                let theme = theme.as_ref();
                let column = theme_column(theme);
                owners.claim(&column, theme, None)?;
                row.set(column, summary.require(theme)?.total);
            }
            Ok(())
        })
        .await
    }

    /// One column per explicit (theme, subtheme) pair
    pub async fn subthemed_historical<T: AsRef<str>, U: AsRef<str>>(
        &self,
        city: &str,
        years: &[i32],
        subthemes: &[(T, U)],
    ) -> Result<HistoricalSeries> {
        self.collect(city, years, |paid, row| {
            let grouped = group_by_theme_and_subtheme(paid)?;
            let mut owners = ColumnOwners::default();
            for (theme, subtheme) in subthemes {
                let (theme, subtheme) = (theme.as_ref(), subtheme.as_ref());
                let column = subtheme_column(theme, subtheme);
                owners.claim(&column, theme, Some(subtheme))?;
                row.set(column, grouped.require(theme, subtheme)?);
            }
            Ok(())
        })
        .await
    }

    /// One column per subtheme found under each theme, discovered per year
    pub async fn all_subthemes_historical<T: AsRef<str>>(
        &self,
        city: &str,
        years: &[i32],
        themes: &[T],
    ) -> Result<HistoricalSeries> {
        self.collect(city, years, |paid, row| {
            let grouped = group_by_theme_and_subtheme(paid)?;
            let mut owners = ColumnOwners::default();
            for theme in themes {
                let theme = theme.as_ref();
                for subtheme in distinct_subthemes(paid, theme)? {
                    let total = grouped.require(theme, &subtheme)?;
                    let column = subtheme_column(theme, &subtheme);
                    owners.claim(&column, theme, Some(&subtheme))?;
                    row.set(column, total);
                }
            }
            Ok(())
        })
        .await
    }

    /// Fetch each year, keep paid lines and let `fill_row` populate the row
    async fn collect<F>(&self, city: &str, years: &[i32], mut fill_row: F) -> Result<HistoricalSeries>
    where
        F: FnMut(&ExpenseTable, &mut SeriesRow) -> Result<()>,
    {
        let mut series = HistoricalSeries::new(city);

        for &year in years {
            let table = self
                .source
                .fetch(city, year)
                .await
                .map_err(|e| e.in_year(city, year))?;
            let paid = only_paid(&table);

            let mut row = SeriesRow::new(year);
            fill_row(&paid, &mut row).map_err(|e| e.in_year(city, year))?;

            debug!(
                "{}/{}: {} paid lines, {} columns via {}",
                city,
                year,
                paid.len(),
                row.len(),
                self.source.name()
            );
            series.push(row);
        }

        Ok(series)
    }
}

/// Free-function form of `SeriesBuilder::themed_historical`
pub async fn themed_historical<S, T>(
    source: &S,
    city: &str,
    years: &[i32],
    themes: &[T],
) -> Result<HistoricalSeries>
where
    S: ExpenseSource + ?Sized,
    T: AsRef<str>,
{
    SeriesBuilder::new(source)
        .themed_historical(city, years, themes)
        .await
}

/// Free-function form of `SeriesBuilder::subthemed_historical`
pub async fn subthemed_historical<S, T, U>(
    source: &S,
    city: &str,
    years: &[i32],
    subthemes: &[(T, U)],
) -> Result<HistoricalSeries>
where
    S: ExpenseSource + ?Sized,
    T: AsRef<str>,
    U: AsRef<str>,
{
    SeriesBuilder::new(source)
        .subthemed_historical(city, years, subthemes)
        .await
}

/// Free-function form of `SeriesBuilder::all_subthemes_historical`
pub async fn all_subthemes_historical<S, T>(
    source: &S,
    city: &str,
    years: &[i32],
    themes: &[T],
) -> Result<HistoricalSeries>
where
    S: ExpenseSource + ?Sized,
    T: AsRef<str>,
{
    SeriesBuilder::new(source)
        .all_subthemes_historical(city, years, themes)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use crate::test_utils::paid;
    use rust_decimal_macros::dec;

    fn sparse_series() -> HistoricalSeries {
        let mut series = HistoricalSeries::new("campinas");
        let mut first = SeriesRow::new(2019);
        first.set("vl_despesa_X_A".into(), dec!(1));
        first.set("vl_despesa_X_B".into(), dec!(2));
        let mut second = SeriesRow::new(2020);
        second.set("vl_despesa_X_A".into(), dec!(3));
        second.set("vl_despesa_X_C".into(), dec!(4));
        series.push(first);
        series.push(second);
        series
    }

    #[test]
    fn test_column_keys() {
        assert_eq!(theme_column("Health"), "vl_despesa_Health");
        assert_eq!(subtheme_column("X", "B"), "vl_despesa_X_B");
    }

    #[test]
    fn test_row_set_replaces_existing_column() {
        let mut row = SeriesRow::new(2019);
        row.set("a".into(), dec!(1));
        row.set("a".into(), dec!(2));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("a"), Some(dec!(2)));
    }

    #[test]
    fn test_columns_first_seen_order() {
        assert_eq!(
            sparse_series().columns(),
            vec!["vl_despesa_X_A", "vl_despesa_X_B", "vl_despesa_X_C"]
        );
    }

    #[test]
    fn test_to_dense_null_fill() {
        let dense = sparse_series().to_dense(FillPolicy::Null).unwrap();
        assert_eq!(dense.rows[0].values, vec![Some(dec!(1)), Some(dec!(2)), None]);
        assert_eq!(dense.rows[1].values, vec![Some(dec!(3)), None, Some(dec!(4))]);
    }

    #[test]
    fn test_to_dense_zero_fill() {
        let dense = sparse_series().to_dense(FillPolicy::Zero).unwrap();
        assert_eq!(dense.rows[0].values[2], Some(Decimal::ZERO));
        assert_eq!(dense.rows[1].values[1], Some(Decimal::ZERO));
    }

    #[test]
    fn test_to_dense_error_fill() {
        let err = sparse_series().to_dense(FillPolicy::Error).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCell { year: 2019, ref column } if column == "vl_despesa_X_C"
        ));
    }

    #[test]
    fn test_fill_policy_from_str() {
        assert_eq!("zero".parse::<FillPolicy>().unwrap(), FillPolicy::Zero);
        assert_eq!("NULL".parse::<FillPolicy>().unwrap(), FillPolicy::Null);
        assert_eq!("error".parse::<FillPolicy>().unwrap(), FillPolicy::Error);
        assert!("nan".parse::<FillPolicy>().is_err());
        assert_eq!(FillPolicy::default(), FillPolicy::Null);
    }

    #[tokio::test]
    async fn test_colliding_pairs_are_rejected() {
        let source = StaticSource::new().with_year(
            "campinas",
            2019,
            vec![paid("A_B", "C", dec!(1)), paid("A", "B_C", dec!(2))],
        );

        let pairs = [("A_B", "C"), ("A", "B_C")];
        let err = subthemed_historical(&source, "campinas", &[2019], &pairs)
            .await
            .unwrap_err();
        assert_eq!(err.year(), Some(2019));
        assert!(matches!(
            err.root(),
            Error::DuplicateColumn { column } if column == "vl_despesa_A_B_C"
        ));
    }

    #[tokio::test]
    async fn test_colliding_discovered_subthemes_are_rejected() {
        let source = StaticSource::new().with_year(
            "campinas",
            2019,
            vec![paid("X", "A_B", dec!(1)), paid("X_A", "B", dec!(2))],
        );

        let err = all_subthemes_historical(&source, "campinas", &[2019], &["X", "X_A"])
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::DuplicateColumn { .. }));
    }

    #[tokio::test]
    async fn test_repeated_selection_is_one_column() {
        let source =
            StaticSource::new().with_year("campinas", 2019, vec![paid("X", "A", dec!(5))]);

        let series = themed_historical(&source, "campinas", &[2019], &["X", "X"])
            .await
            .unwrap();
        assert_eq!(series.columns(), vec!["vl_despesa_X"]);
        assert_eq!(series.rows()[0].get("vl_despesa_X"), Some(dec!(5)));
    }

    #[tokio::test]
    async fn test_overflow_aborts_series_with_year() {
        let source = StaticSource::new()
            .with_year("campinas", 2019, vec![paid("X", "A", dec!(1))])
            .with_year(
                "campinas",
                2020,
                vec![paid("X", "A", Decimal::MAX), paid("X", "A", dec!(1))],
            );

        let err = themed_historical(&source, "campinas", &[2019, 2020], &["X"])
            .await
            .unwrap_err();
        assert_eq!(err.year(), Some(2020));
        assert!(matches!(err.root(), Error::Overflow(_)));
    }
}
