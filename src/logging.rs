//! `tracing` subscriber setup for the binary.
//!
//! `RUST_LOG` takes precedence; otherwise `-v` flags pick the level of this
//! crate's events.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::utils::ensure_parent_directory;

/// Level of this crate's events for a `-v` count.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("inkdrop={}", level_for(verbosity))))
}

/// Logs to stderr. Used by the CLI commands.
pub fn init_stderr(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Logs to a file, appending. Used while the terminal UI owns the screen.
pub fn init_file(path: &Path, verbosity: u8) -> Result<()> {
    ensure_parent_directory(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::INFO);
        assert_eq!(level_for(2), Level::DEBUG);
        assert_eq!(level_for(9), Level::TRACE);
    }

    #[test]
    fn init_file_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("inkdrop.log");

        init_file(&path, 1).unwrap();

        assert!(path.exists());
    }
}
