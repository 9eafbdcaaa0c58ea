//! Output formatting utilities

use console::style;

/// Print a dim horizontal separator line
pub fn separator() {
    println!("{}", style("─".repeat(60)).dim());
}

/// Print a bold key with its value
pub fn kv(key: &str, value: impl std::fmt::Display) {
    println!("{}: {}", style(key).bold(), value);
}

/// Print a success line
pub fn success(message: impl std::fmt::Display) {
    println!("{} {}", style("✓").green(), message);
}

/// Print a row-numbered import error
pub fn row_error(row: usize, message: impl std::fmt::Display) {
    eprintln!("{} {} (row {})", style("✗").red(), message, row);
}
