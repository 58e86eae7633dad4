// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod credentials;
pub mod render;
pub mod repl;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::core::db::{ConnectionPool, DatabaseEntry, QueryResult, SlotState};
pub use crate::core::{ErrorKind, MultiDbError, Result};
