/// Database Module
///
/// The database layer is split into four concerns:
/// - **Connection** (`connection.rs`): driver traits, backends and the connector
/// - **Query Results** (`query.rs`): the normalized result type
/// - **Pool** (`pool.rs`): per-name slots and the query dispatcher
/// - **Drivers** (`mysql_driver.rs`, `sqlite_driver.rs`): backend implementations
///
/// All operations return the crate-wide `MultiDbError`.
pub mod connection;
pub mod mysql_driver;
pub mod pool;
pub mod query;
pub mod sqlite_driver;

pub use connection::*;
pub use pool::*;
pub use query::*;
