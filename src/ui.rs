use chrono::{DateTime, Utc};
use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Echo a git command before it runs
pub fn command(branch: Option<&str>, args: &[&str]) {
    let line = format!("git {}", args.join(" "));
    match branch {
        Some(branch) => println!("\n{} {}", format!("[{branch}]").bold(), line.bold()),
        None => println!("\n{}", line.bold()),
    }
}

// ============================================================================
// Time Formatting
// ============================================================================

/// Describe how long ago `then` was, relative to `now`
pub fn format_elapsed(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        0..=59 => format!("{seconds}s ago"),
        60..=3599 => format!("{}m ago", seconds / 60),
        3600..=86_399 => format!("{}h {}m ago", seconds / 3600, (seconds % 3600) / 60),
        _ => format!("{}d ago", seconds / 86_400),
    }
}

/// Render a boolean setting the way git config stores it
pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

// ============================================================================
// Tests
// ============================================================================
