//! Runtime configuration from the environment.
//!
//! Variables (a `.env` file in the working directory is honoured):
//! - `INKDROP_BACKEND`: `sqlite` (default), `memory` or `remote`
//! - `INKDROP_DB`: SQLite file, defaults to [`utils::get_database_path`]
//! - `INKDROP_API_URL`, `INKDROP_API_KEY`: record API for the remote backend
//! - `INKDROP_AUTOSAVE_MS`: editor idle window in milliseconds

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::editor::DEFAULT_AUTOSAVE_IDLE;
use crate::record::HttpRecordClientBuilder;
use crate::store::{MemoryStore, RemoteStore, SqliteStore, Store};
use crate::utils;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown backend '{0}' (expected sqlite, memory or remote)")]
    UnknownBackend(String),

    #[error("INKDROP_AUTOSAVE_MS must be a positive number of milliseconds, got '{0}'")]
    InvalidAutosave(String),
}

/// Which [`Store`] implementation backs the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Memory => f.write_str("memory"),
            Backend::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "memory" | "mock" => Ok(Backend::Memory),
            "remote" => Ok(Backend::Remote),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    /// Explicit SQLite path; `None` means the per-user default.
    pub db_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub autosave_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            db_path: None,
            api_url: None,
            api_key: None,
            autosave_idle: DEFAULT_AUTOSAVE_IDLE,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend = match get("INKDROP_BACKEND") {
            Some(value) => value.parse()?,
            None => Backend::default(),
        };
        let autosave_idle = match get("INKDROP_AUTOSAVE_MS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidAutosave(value)),
            },
            None => DEFAULT_AUTOSAVE_IDLE,
        };

        Ok(Self {
            backend,
            db_path: get("INKDROP_DB").map(PathBuf::from),
            api_url: get("INKDROP_API_URL"),
            api_key: get("INKDROP_API_KEY"),
            autosave_idle,
        })
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// The SQLite file to use, resolving the per-user default.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => utils::get_database_path(),
        }
    }

    /// Opens the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the record API
    /// client cannot be built.
    pub fn open_store(&self) -> Result<Arc<dyn Store>> {
        let store: Arc<dyn Store> = match self.backend {
            Backend::Memory => Arc::new(MemoryStore::seeded()),
            Backend::Sqlite => {
                let path = self.database_path()?;
                utils::ensure_parent_directory(&path)?;
                info!(path = %path.display(), "opening sqlite store");
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("Failed to open database: {}", path.display()))?;
                Arc::new(store)
            }
            Backend::Remote => {
                let mut builder = HttpRecordClientBuilder::new();
                if let Some(url) = &self.api_url {
                    builder = builder.base_url(url);
                }
                if let Some(key) = &self.api_key {
                    builder = builder.api_key(key);
                }
                let client = builder.build().context("Failed to configure record API client")?;
                info!(base_url = client.base_url(), "using remote store");
                Arc::new(RemoteStore::new(client))
            }
        };
        Ok(store)
    }
}
