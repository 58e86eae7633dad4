/// Error Module
///
/// This module defines the error types shared by the pool, the connector,
/// the credential loaders and the CLI.
use std::path::PathBuf;
use thiserror::Error;

/// Client error code reported when the server cannot be reached at all.
pub const CR_CONNECTION_ERROR: u16 = 2002;

/// Client error code for connect failures with no more specific cause.
pub const CR_UNKNOWN_ERROR: u16 = 2000;

/// Error type for every multidb operation.
///
/// Only two failure kinds come from talking to a database:
/// - `Connect`: opening a connection failed
/// - `Query`: executing a statement on an open connection failed
///
/// The remaining variants cover lookup, configuration and I/O problems.
#[derive(Error, Debug)]
pub enum MultiDbError {
    /// Opening a connection failed
    #[error("Failed to connect to {name}: ({code}) {message}")]
    Connect {
        name: String,
        code: u16,
        message: String,
    },

    /// Executing a statement failed
    #[error("Query on {name} failed: {message}")]
    Query {
        name: String,
        message: String,
        query: String,
    },

    /// The logical name is not in the registry
    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    /// The credential file could not be read
    #[error("Cannot read credentials from {}: {source}", .path.display())]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A slot lock was poisoned by a panicking holder
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Coarse classification of a [`MultiDbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connect,
    Query,
    Other,
}

impl MultiDbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultiDbError::Connect { .. } | MultiDbError::Credentials { .. } => ErrorKind::Connect,
            MultiDbError::Query { .. } => ErrorKind::Query,
            _ => ErrorKind::Other,
        }
    }

    /// Returns the SQL text of a failed query, if this is a query error.
    pub fn query_text(&self) -> Option<&str> {
        match self {
            MultiDbError::Query { query, .. } => Some(query),
            _ => None,
        }
    }
}

/// Type alias for Result to use MultiDbError as the error type.
pub type Result<T> = std::result::Result<T, MultiDbError>;
