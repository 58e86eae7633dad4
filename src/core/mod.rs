/// Core Module for multidb
///
/// Shared infrastructure: database slots and drivers, plus the error type
/// used across the crate.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, MultiDbError, Result};
