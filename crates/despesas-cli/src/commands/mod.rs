//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Config/source setup and argument parsing shared by commands
//! - `reports` - Single-year theme and subtheme reports
//! - `history` - Multi-year series (themes, subtheme pairs, all subthemes)
//! - `cache` - Archive cache management (list, clear)

pub mod cache;
pub mod core;
pub mod history;
pub mod reports;

// Re-export command functions for main.rs
pub use cache::*;
pub use core::*;
pub use history::*;
pub use reports::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
