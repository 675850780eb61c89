//! Single-year report command implementations

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use despesas_core::{group_by_subtheme, group_by_theme, only_paid, ExpenseSource, ThemeSummary};
use rust_decimal::Decimal;

use super::truncate;

pub async fn cmd_themes<S: ExpenseSource + ?Sized>(source: &S, city: &str, year: i32) -> Result<()> {
    let table = source
        .fetch(city, year)
        .await
        .with_context(|| format!("Failed to load expenses for {}/{}", city, year))?;
    let paid = only_paid(&table);
    let summary = group_by_theme(&paid)
        .with_context(|| format!("Failed to total expenses for {}/{}", city, year))?;

    println!();
    println!("📊 Paid expenses by theme");
    println!("   {} {} ({} of {} lines paid)", city, year, paid.len(), table.len());
    println!("   ─────────────────────────────────────────────────────────────");

    if summary.is_empty() {
        println!("   No paid expenses found.");
        return Ok(());
    }

    print!("{}", render_themes(&summary)?);
    Ok(())
}

pub async fn cmd_subthemes<S: ExpenseSource + ?Sized>(
    source: &S,
    city: &str,
    year: i32,
    theme: &str,
) -> Result<()> {
    let table = source
        .fetch(city, year)
        .await
        .with_context(|| format!("Failed to load expenses for {}/{}", city, year))?;
    let paid = only_paid(&table);
    let totals = group_by_subtheme(&paid, theme)
        .with_context(|| format!("No paid expenses under {} in {}/{}", theme, city, year))?;

    println!();
    println!("📊 {} by subtheme", theme);
    println!("   {} {}", city, year);
    println!("   ─────────────────────────────────────────────────────────────");
    print!("{}", render_subthemes(&totals)?);
    Ok(())
}

/// Theme table with subtheme counts and a total line
pub fn render_themes(summary: &ThemeSummary) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!(
        "   {:40} │ {:>18} │ {:>10}\n",
        "Theme", "Paid", "Subthemes"
    ));
    out.push_str("   ─────────────────────────────────────────┼────────────────────┼───────────\n");

    for (theme, totals) in summary.iter() {
        out.push_str(&format!(
            "   {:40} │ {:>18.2} │ {:>10}\n",
            truncate(theme, 40),
            totals.total,
            totals.subthemes.len()
        ));
    }

    let total = summary.total().context("Failed to total all themes")?;
    out.push_str(&format!("   {:40} │ {:>18.2} │\n", "Total", total));
    Ok(out)
}

pub fn render_subthemes(totals: &BTreeMap<String, Decimal>) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("   {:40} │ {:>18}\n", "Subtheme", "Paid"));
    out.push_str("   ─────────────────────────────────────────┼───────────────────\n");

    for (subtheme, total) in totals {
        out.push_str(&format!("   {:40} │ {:>18.2}\n", truncate(subtheme, 40), total));
    }

    let sum = totals
        .values()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .context("Subtheme total overflows")?;
    out.push_str(&format!("   {:40} │ {:>18.2}\n", "Total", sum));
    Ok(out)
}
