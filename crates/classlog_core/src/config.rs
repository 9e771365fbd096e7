//! Engine configuration loaded from a JSON file.
//!
//! # Responsibility
//! - Describe which store backend to open and where.
//! - Carry history retention and logging knobs.
//!
//! # Invariants
//! - A validated config has a non-empty store path, `retention_days >= 1`
//!   and `max_snapshots >= 1`.
//! - Relative paths in a config file resolve against the file's directory.

use crate::store::{JsonFileStore, SqliteStore, Store, StoreResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_MAX_SNAPSHOTS: u32 = 20;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub store: StoreConfig,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_max_snapshots() -> u32 {
    DEFAULT_MAX_SNAPSHOTS
}

impl EngineConfig {
    /// Config with default retention for a store at `path`.
    pub fn new(backend: StoreBackend, path: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreConfig {
                backend,
                path: path.into(),
            },
            retention_days: DEFAULT_RETENTION_DAYS,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            log_level: None,
            log_dir: None,
        }
    }

    /// Reads, path-resolves and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Parses and validates config JSON without touching the filesystem.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        if self.retention_days == 0 {
            return Err(ConfigError::Invalid(
                "retention_days must be at least 1".to_string(),
            ));
        }
        if self.max_snapshots == 0 {
            return Err(ConfigError::Invalid(
                "max_snapshots must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if self.store.path.is_relative() {
            self.store.path = base.join(&self.store.path);
        }
        if let Some(dir) = self.log_dir.as_mut().filter(|dir| dir.is_relative()) {
            *dir = base.join(&*dir);
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::days(i64::from(self.retention_days))
    }

    /// Opens the configured store backend.
    pub fn open_store(&self) -> StoreResult<Box<dyn Store>> {
        match self.store.backend {
            StoreBackend::Json => Ok(Box::new(JsonFileStore::new(&self.store.path))),
            StoreBackend::Sqlite => Ok(Box::new(SqliteStore::open(
                &self.store.path,
                self.max_snapshots,
            )?)),
        }
    }
}
