//! Aggregation of expense tables into theme and subtheme totals
//!
//! All functions are pure. Grouping uses ordered maps, so the result never
//! depends on the row order of the input table.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::models::{ExpenseTable, ThemeSubthemeSummary, ThemeSummary, ThemeTotal};

/// Keep only records that were actually paid, in their original order
pub fn only_paid(table: &ExpenseTable) -> ExpenseTable {
    ExpenseTable {
        city: table.city.clone(),
        year: table.year,
        records: table
            .iter()
            .filter(|r| r.status.is_paid())
            .cloned()
            .collect(),
    }
}

/// All distinct themes in the table
pub fn distinct_themes(table: &ExpenseTable) -> BTreeSet<String> {
    table.iter().map(|r| r.theme.clone()).collect()
}

/// All distinct subthemes under `theme`
///
/// Fails with `UnknownTheme` when no record carries the theme.
pub fn distinct_subthemes(table: &ExpenseTable, theme: &str) -> Result<BTreeSet<String>> {
    let subthemes: BTreeSet<String> = table
        .iter()
        .filter(|r| r.theme == theme)
        .map(|r| r.subtheme.clone())
        .collect();

    if subthemes.is_empty() {
        return Err(Error::UnknownTheme {
            theme: theme.to_string(),
        });
    }
    Ok(subthemes)
}

/// Total amount per (theme, subtheme)
///
/// Fails with `Overflow` when a total leaves the decimal range.
pub fn group_by_theme_and_subtheme(table: &ExpenseTable) -> Result<ThemeSubthemeSummary> {
    let mut totals: BTreeMap<(String, String), Decimal> = BTreeMap::new();
    for record in table.iter() {
        let total = totals
            .entry((record.theme.clone(), record.subtheme.clone()))
            .or_default();
        *total = total.checked_add(record.amount).ok_or_else(|| {
            Error::Overflow(format!("{}/{}", record.theme, record.subtheme))
        })?;
    }
    Ok(ThemeSubthemeSummary::from_map(totals))
}

/// Total amount per theme, with the subthemes seen under each
///
/// Built by re-aggregating `group_by_theme_and_subtheme`, so a theme total
/// is always the sum of its subtheme totals.
pub fn group_by_theme(table: &ExpenseTable) -> Result<ThemeSummary> {
    let mut themes: BTreeMap<String, ThemeTotal> = BTreeMap::new();
    for (theme, subtheme, total) in group_by_theme_and_subtheme(table)?.iter() {
        let entry = themes.entry(theme.to_string()).or_default();
        entry.total = entry
            .total
            .checked_add(total)
            .ok_or_else(|| Error::Overflow(theme.to_string()))?;
        entry.subthemes.insert(subtheme.to_string());
    }
    Ok(ThemeSummary::from_map(themes))
}

/// Subtheme totals under one theme
///
/// Fails with `UnknownTheme` when the theme has no records.
pub fn group_by_subtheme(table: &ExpenseTable, theme: &str) -> Result<BTreeMap<String, Decimal>> {
    let grouped = group_by_theme_and_subtheme(table)?;
    let subthemes: BTreeMap<String, Decimal> = grouped
        .subthemes_of(theme)
        .map(|(sub, total)| (sub.to_string(), total))
        .collect();

    if subthemes.is_empty() {
        return Err(Error::UnknownTheme {
            theme: theme.to_string(),
        });
    }
    Ok(subthemes)
}
