//! CLI output formatting with colors and styling.
//!
//! Respects NO_COLOR and FORCE_COLOR environment variables. Colors
//! are automatically disabled when output is piped.

use colored::{ColoredString, Colorize};

/// Initialize color support based on environment.
/// Call once at startup.
pub fn init() {
    // colored handles NO_COLOR on its own; add explicit FORCE_COLOR
    // support on top.
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

pub fn heading(text: &str) -> ColoredString {
    text.bold()
}

pub fn banner_ok(phase: &str) -> String {
    format!("{} {}", "===".dimmed(), format!("{} OK", phase).green().bold())
}

pub fn banner_failed(phase: &str, errors: usize) -> String {
    format!(
        "{} {}",
        "===".dimmed(),
        format!("{} FAILED: {} error(s)", phase, errors).red().bold()
    )
}
