//! Shared helpers for paths and relative times.
//!
//! These functions are reused across the CLI and TUI interfaces.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;

const APP_DIR: &str = "inkdrop";

/// Gets the cross-platform data directory of the application.
///
/// Returns `{data_dir}/inkdrop` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_data_directory() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join(APP_DIR))
}

/// Gets the default database path, `{data_dir}/inkdrop/notes.db`.
pub fn get_database_path() -> Result<PathBuf> {
    Ok(get_data_directory()?.join("notes.db"))
}

/// Gets the log file used while the terminal UI owns the screen.
pub fn get_log_path() -> Result<PathBuf> {
    Ok(get_data_directory()?.join("inkdrop.log"))
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_parent_directory(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Formats `at` relative to `now`, e.g. `"5 minutes ago"`.
///
/// Times in the future (clock skew) read as `"just now"`.
///
/// # Examples
///
/// ```
/// use inkdrop::utils::format_ago;
/// use time::macros::datetime;
///
/// let now = datetime!(2024-03-10 12:00 UTC);
/// assert_eq!(format_ago(datetime!(2024-03-10 11:59:40 UTC), now), "just now");
/// assert_eq!(format_ago(datetime!(2024-03-10 09:00 UTC), now), "3 hours ago");
/// ```
pub fn format_ago(at: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - at;
    let minutes = elapsed.whole_minutes();
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();

    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        plural(minutes, "minute")
    } else if days < 1 {
        plural(hours, "hour")
    } else if days < 30 {
        plural(days, "day")
    } else if days < 365 {
        plural(days / 30, "month")
    } else {
        plural(days / 365, "year")
    }
}
