/// Connection Module
///
/// Driver traits, the backend selector and the connector that turns a
/// credential source into a live connection.

use crate::core::db::pool::DatabaseEntry;
use crate::core::db::query::QueryResult;
use crate::core::db::{mysql_driver::MysqlConnector, sqlite_driver::SqliteConnector};
use crate::core::{MultiDbError, Result};
use crate::credentials::Credentials;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Default MySQL TCP port
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// An open connection to one database.
pub trait DbConnection: Send {
    /// Lightweight round-trip check. `false` means the handle is unusable.
    fn ping(&mut self) -> bool;

    /// Executes one statement and returns its first result set.
    ///
    /// Errors are returned as the driver's message text; the pool wraps them
    /// into `MultiDbError::Query`.
    fn execute(&mut self, sql: &str) -> std::result::Result<QueryResult, String>;
}

/// Failure reported by a driver while opening a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFailure {
    pub code: u16,
    pub message: String,
}

/// Opens connections for one backend.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        credentials: &Credentials,
        port: Option<u16>,
    ) -> std::result::Result<Box<dyn DbConnection>, ConnectFailure>;
}

/// Supported database backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mysql,
    Sqlite,
}

impl Backend {
    pub fn connector(self) -> Arc<dyn Connector> {
        match self {
            Backend::Mysql => Arc::new(MysqlConnector),
            Backend::Sqlite => Arc::new(SqliteConnector),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Mysql => "mysql",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Product name used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            Backend::Mysql => "MySQL",
            Backend::Sqlite => "SQLite",
        }
    }
}

/// Loads the entry's credentials and opens a connection with `connector`.
///
/// Every failure is logged once at error level before being returned.
pub fn open_connection(entry: &DatabaseEntry, connector: &dyn Connector) -> Result<Box<dyn DbConnection>> {
    let name = entry.name.as_str();
    let credentials = entry.source.load().inspect_err(|e| {
        error!(database = name, error = %e, "Failed to load credentials");
    })?;

    if !credentials.is_complete() {
        debug!(database = name, source = %entry.source.describe(), "credential fields missing");
    }

    debug!(database = name, host = %credentials.host, "opening connection");
    connector.open(&credentials, entry.port).map_err(|failure| {
        error!(
            database = name,
            backend = entry.backend.as_str(),
            "Failed to connect to {}: ({}) {}",
            entry.backend.label(),
            failure.code,
            failure.message
        );
        MultiDbError::Connect {
            name: name.to_string(),
            code: failure.code,
            message: failure.message,
        }
    })
}
