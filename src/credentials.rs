//! Credential loading for logical databases.
//!
//! A credential file holds four newline-separated lines: host, database
//! name, user and password. Parsing is positional and never fails; missing
//! lines leave the corresponding field empty so the failure surfaces when the
//! connection is attempted.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::core::{MultiDbError, Result};

/// Suffix appended to a logical name to form its credential file name.
pub const CREDENTIAL_FILE_SUFFIX: &str = "_db_info";

/// Prefix of the environment variables read by [`CredentialSource::Env`].
pub const ENV_PREFIX: &str = "MULTIDB";

/// Connection parameters for one logical database.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Parses the positional credential format.
    ///
    /// Lines are split on `\n` only. Lines past the fourth are ignored.
    pub fn parse(contents: &str) -> Self {
        let mut lines = contents.split('\n').map(str::to_string);
        Credentials {
            host: lines.next().unwrap_or_default(),
            database: lines.next().unwrap_or_default(),
            user: lines.next().unwrap_or_default(),
            password: lines.next().unwrap_or_default(),
        }
    }

    /// Reads and parses a credential file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading credential file");
        let contents = fs::read_to_string(path).map_err(|source| MultiDbError::Credentials {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    /// Builds credentials from `<prefix>_HOST`, `<prefix>_DATABASE`,
    /// `<prefix>_USER` and `<prefix>_PASSWORD` using `lookup`.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let field = |suffix: &str| lookup(&format!("{prefix}_{suffix}")).unwrap_or_default();
        Credentials {
            host: field("HOST"),
            database: field("DATABASE"),
            user: field("USER"),
            password: field("PASSWORD"),
        }
    }

    /// Whether every field has content.
    pub fn is_complete(&self) -> bool {
        !(self.host.is_empty()
            || self.database.is_empty()
            || self.user.is_empty()
            || self.password.is_empty())
    }
}

/// Path of the credential file for `name`: `<base_dir>/../<name>_db_info`.
pub fn credential_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir
        .join("..")
        .join(format!("{name}{CREDENTIAL_FILE_SUFFIX}"))
}

/// Environment variable prefix for `name`, e.g. `MULTIDB_EXACT_BN_POOL`.
pub fn env_prefix(name: &str) -> String {
    let upper: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_PREFIX}_{upper}")
}

/// Where a slot gets its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A plaintext four-line file
    File(PathBuf),
    /// Process environment variables sharing a prefix
    Env { prefix: String },
}

impl CredentialSource {
    pub fn load(&self) -> Result<Credentials> {
        match self {
            CredentialSource::File(path) => Credentials::from_file(path),
            CredentialSource::Env { prefix } => {
                Ok(Credentials::from_lookup(prefix, |key| std::env::var(key).ok()))
            }
        }
    }

    /// Human-readable location, for logs and the REPL status listing.
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::File(path) => path.display().to_string(),
            CredentialSource::Env { prefix } => format!("env:{prefix}_*"),
        }
    }
}

/// Credential source kind as written in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Env,
}
