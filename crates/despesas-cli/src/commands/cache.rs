//! Archive cache command implementations

use anyhow::{Context, Result};
use despesas_core::ArchiveCache;

pub fn cmd_cache_list(cache: &ArchiveCache) -> Result<()> {
    let archives = cache.list().context("Failed to read archive cache")?;

    println!();
    println!("📦 Cached archives in {}", cache.dir().display());
    println!("   ─────────────────────────────────────────────────────────────");

    if archives.is_empty() {
        println!("   No archives cached yet.");
        return Ok(());
    }

    println!("   {:30} │ {:>6} │ {:>12}", "City", "Year", "Size");
    println!("   ───────────────────────────────┼────────┼─────────────");
    let mut total = 0u64;
    for archive in &archives {
        println!(
            "   {:30} │ {:>6} │ {:>12}",
            super::truncate(&archive.city, 30),
            archive.year,
            format_size(archive.size)
        );
        total += archive.size;
    }
    println!();
    println!("   {} archives, {}", archives.len(), format_size(total));

    Ok(())
}

pub fn cmd_cache_clear(cache: &ArchiveCache, city: Option<&str>, year: Option<i32>) -> Result<()> {
    match (city, year) {
        (Some(city), Some(year)) => {
            if cache.remove(city, year).context("Failed to remove archive")? {
                println!("🗑️  Removed {}/{}", city, year);
            } else {
                println!("   {}/{} is not cached", city, year);
            }
        }
        _ => {
            let removed = cache.clear().context("Failed to clear archive cache")?;
            println!("🗑️  Removed {} cached archives", removed);
        }
    }
    Ok(())
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
