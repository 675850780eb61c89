//! History command implementations
//!
//! Builds a series through `SeriesBuilder`, materializes it with the chosen
//! fill policy and prints it as a table, CSV or JSON.

use anyhow::{Context, Result};
use despesas_core::export::{to_json_string, write_csv};
use despesas_core::{DenseSeries, ExpenseSource, ExportFormat, SeriesBuilder};

use super::{parse_pair, parse_years};
use crate::cli::{HistoryKind, SeriesArgs};

pub async fn cmd_history<S: ExpenseSource + ?Sized>(source: &S, kind: &HistoryKind) -> Result<()> {
    let (args, dense) = build_history(source, kind).await?;
    print!("{}", render_history(&dense, args.format)?);
    Ok(())
}

/// Build and materialize the series a history command asks for
pub async fn build_history<'k, S: ExpenseSource + ?Sized>(
    source: &S,
    kind: &'k HistoryKind,
) -> Result<(&'k SeriesArgs, DenseSeries)> {
    let builder = SeriesBuilder::new(source);

    let (args, series) = match kind {
        HistoryKind::Themes { series, themes } => {
            let years = parse_years(&series.years)?;
            let built = builder
                .themed_historical(&series.city, &years, themes.as_slice())
                .await;
            (series, built)
        }
        HistoryKind::Subthemes { series, pairs } => {
            let years = parse_years(&series.years)?;
            let pairs = pairs
                .iter()
                .map(|p| parse_pair(p))
                .collect::<Result<Vec<_>>>()?;
            let built = builder
                .subthemed_historical(&series.city, &years, pairs.as_slice())
                .await;
            (series, built)
        }
        HistoryKind::AllSubthemes { series, themes } => {
            let years = parse_years(&series.years)?;
            let built = builder
                .all_subthemes_historical(&series.city, &years, themes.as_slice())
                .await;
            (series, built)
        }
    };

    let series =
        series.with_context(|| format!("Failed to build history for {}", args.city))?;
    let dense = series
        .to_dense(args.fill)
        .with_context(|| format!("Cannot fill missing cells with --fill {}", args.fill.as_str()))?;

    Ok((args, dense))
}

/// Render a materialized series in the requested format
pub fn render_history(series: &DenseSeries, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Table => Ok(render_table(series)),
        ExportFormat::Csv => {
            let mut buf = Vec::new();
            write_csv(series, &mut buf).context("Failed to write CSV")?;
            String::from_utf8(buf).context("CSV output is not valid UTF-8")
        }
        ExportFormat::Json => {
            let mut json = to_json_string(series).context("Failed to write JSON")?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_table(series: &DenseSeries) -> String {
    let widths: Vec<usize> = series
        .columns
        .iter()
        .map(|c| c.chars().count().max(14))
        .collect();

    let mut out = String::new();
    out.push_str(&format!("{:>6}", "year"));
    for (column, width) in series.columns.iter().zip(&widths) {
        out.push_str(&format!(" │ {:>width$}", column, width = width));
    }
    out.push('\n');

    out.push_str(&"─".repeat(6));
    for width in &widths {
        out.push_str("─┼─");
        out.push_str(&"─".repeat(*width));
    }
    out.push('\n');

    for row in &series.rows {
        out.push_str(&format!("{:>6}", row.year));
        for (value, width) in row.values.iter().zip(&widths) {
            let cell = match value {
                Some(v) => format!("{:.2}", v),
                None => "-".to_string(),
            };
            out.push_str(&format!(" │ {:>width$}", cell, width = width));
        }
        out.push('\n');
    }

    out
}
