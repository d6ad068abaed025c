//! Runtime configuration for the curriculum core.
//!
//! # Responsibility
//! - Load `CoreConfig` from a TOML file, then apply environment overrides.
//! - Build the configured `DocumentStore`.
//!
//! # Invariants
//! - Missing keys fall back to defaults; a missing file is an error only when
//!   a path was given explicitly.
//! - `validate` normalizes `log_level` to a lowercase level name.

use crate::logging::{default_log_level, normalize_level};
use crate::store::{DocumentStore, MemoryStore, SqliteStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const ENV_LOG_LEVEL: &str = "CURRICULUM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CURRICULUM_LOG_DIR";
pub const ENV_DB_PATH: &str = "CURRICULUM_DB_PATH";

/// Backing store selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute log directory; file logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub store: StoreBackend,
    /// Insert the sample curriculum on startup when missing.
    pub seed_fixtures: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            store: StoreBackend::Memory,
            seed_fixtures: true,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

impl CoreConfig {
    /// Parses a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(contents: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads `path` (or defaults when `None`), applies process environment
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_toml_str(&contents, path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `CURRICULUM_*` overrides looked up through `lookup`.
    ///
    /// `CURRICULUM_DB_PATH` switches the store to SQLite at that path.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = non_empty(ENV_DB_PATH) {
            self.store = StoreBackend::Sqlite {
                path: PathBuf::from(path),
            };
        }
    }

    pub fn validate(&mut self) -> ConfigResult<()> {
        self.log_level = normalize_level(&self.log_level)
            .map_err(ConfigError::Invalid)?
            .to_string();
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        if let StoreBackend::Sqlite { path } = &self.store {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("sqlite store path cannot be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Opens the configured store.
    pub fn open_store(&self) -> StoreResult<Rc<dyn DocumentStore>> {
        Ok(match &self.store {
            StoreBackend::Memory => Rc::new(MemoryStore::new()),
            StoreBackend::Sqlite { path } => Rc::new(SqliteStore::open(path)?),
        })
    }
}
