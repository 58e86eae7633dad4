use crate::core::db::{Backend, ConnectionPool, DatabaseEntry, DEFAULT_DATABASES};
use crate::core::{MultiDbError, Result};
use crate::credentials::{credential_path, env_prefix, CredentialSource, SourceKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Directory credential paths are resolved against (`<base_dir>/../<name>_db_info`).
    pub base_dir: Option<PathBuf>,
    /// Registered databases. Absent means the three defaults.
    pub databases: Option<Vec<DatabaseConfig>>,
}

/// One `[[databases]]` table.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub source: SourceKind,
    pub credential_file: Option<PathBuf>,
    pub port: Option<u16>,
}

impl DatabaseConfig {
    fn into_entry(self, base_dir: &Path) -> DatabaseEntry {
        let source = match self.source {
            SourceKind::File => CredentialSource::File(
                self.credential_file
                    .unwrap_or_else(|| credential_path(base_dir, &self.name)),
            ),
            SourceKind::Env => CredentialSource::Env {
                prefix: env_prefix(&self.name),
            },
        };
        DatabaseEntry {
            name: self.name,
            source,
            backend: self.backend,
            port: self.port,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MultiDbError::Config(e.to_string()))
    }

    /// Base directory, defaulting to the current directory.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Builds the registry entries described by this configuration.
    pub fn entries(self) -> Result<Vec<DatabaseEntry>> {
        let base_dir = self.base_dir();
        let databases = match self.databases {
            Some(databases) => databases,
            None => {
                return Ok(DEFAULT_DATABASES
                    .iter()
                    .map(|name| DatabaseEntry::file_backed(&base_dir, name))
                    .collect())
            }
        };

        let mut seen = HashSet::new();
        databases
            .into_iter()
            .map(|db| {
                if db.name.trim().is_empty() {
                    return Err(MultiDbError::Config("database name must not be empty".to_string()));
                }
                if !seen.insert(db.name.clone()) {
                    return Err(MultiDbError::Config(format!("duplicate database name: {}", db.name)));
                }
                Ok(db.into_entry(&base_dir))
            })
            .collect()
    }

    /// Builds a connection pool from this configuration.
    pub fn into_pool(self) -> Result<ConnectionPool> {
        let mut pool = ConnectionPool::new();
        for entry in self.entries()? {
            debug!(database = %entry.name, backend = entry.backend.as_str(), "registering database");
            pool.register(entry)?;
        }
        Ok(pool)
    }
}

/// Default configuration location: `<config dir>/multidb/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("multidb").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = multidb::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml(&content)
}

/// Loads `path` if given, else the default location if it exists, else the
/// built-in defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => Ok(Config::default()),
    }
}
