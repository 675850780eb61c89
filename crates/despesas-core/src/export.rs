//! Export of materialized historical series
//!
//! Supports:
//! - CSV with a `year` column followed by one column per selection
//! - JSON as an array of `{ "year": ..., "<column>": ... }` objects

use std::io::Write;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::series::DenseSeries;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Human-readable aligned table
    #[default]
    Table,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {} (valid: table, csv, json)", s)),
        }
    }
}

/// Write a series as CSV; empty cells are left blank
pub fn write_csv<W: Write>(series: &DenseSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["year".to_string()];
    header.extend(series.columns.iter().cloned());
    wtr.write_record(&header)?;

    for row in &series.rows {
        let mut record = vec![row.year.to_string()];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|d| d.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render a series as a JSON array of row objects
///
/// Totals are emitted as strings to keep full decimal precision; empty
/// cells become `null`.
pub fn to_json(series: &DenseSeries) -> Value {
    let rows = series
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            object.insert("year".to_string(), Value::from(row.year));
            for (column, value) in series.columns.iter().zip(&row.values) {
                let value = value.map_or(Value::Null, |d| Value::String(d.to_string()));
                object.insert(column.clone(), value);
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

/// Pretty-printed JSON string of a series
pub fn to_json_string(series: &DenseSeries) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_json(series))?)
}
