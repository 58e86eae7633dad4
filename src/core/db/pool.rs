/// Pool Module
///
/// One slot per logical database name. Each slot caches at most one
/// connection and tracks whether that connection is believed usable.
///
/// ## Slot states
///
/// - `Disconnected`: nothing cached yet, or explicitly dropped
/// - `Connected`: a handle is cached and its last check succeeded
/// - `Broken`: the cached handle failed its liveness probe and was dropped
///
/// Any successful connect moves a slot to `Connected`. A failed connect
/// leaves the state where it was.

use crate::core::db::connection::{open_connection, Backend, Connector, DbConnection};
use crate::core::db::query::QueryResult;
use crate::core::{MultiDbError, Result};
use crate::credentials::{credential_path, CredentialSource};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Logical names registered when no configuration overrides them
pub const DEFAULT_DATABASES: [&str; 3] = ["exact_batchnorm", "exact_bn_pool", "exact_bn_sfmp"];

/// Connection state of a slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Disconnected,
    Connected,
    Broken,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SlotState::Disconnected => "disconnected",
            SlotState::Connected => "connected",
            SlotState::Broken => "broken",
        };
        f.write_str(label)
    }
}

/// Registration data for one logical database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    pub name: String,
    pub source: CredentialSource,
    pub backend: Backend,
    pub port: Option<u16>,
}

impl DatabaseEntry {
    /// A MySQL entry reading `<base_dir>/../<name>_db_info`.
    pub fn file_backed(base_dir: &Path, name: &str) -> Self {
        DatabaseEntry {
            name: name.to_string(),
            source: CredentialSource::File(credential_path(base_dir, name)),
            backend: Backend::Mysql,
            port: None,
        }
    }
}

/// Snapshot of a slot, for status listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    pub name: String,
    pub backend: Backend,
    pub source: String,
    pub state: SlotState,
    pub connects: u64,
}

struct Slot {
    entry: DatabaseEntry,
    connector: Arc<dyn Connector>,
    state: SlotState,
    connection: Option<Box<dyn DbConnection>>,
    connects: u64,
}

impl Slot {
    fn new(entry: DatabaseEntry, connector: Arc<dyn Connector>) -> Self {
        Slot {
            entry,
            connector,
            state: SlotState::default(),
            connection: None,
            connects: 0,
        }
    }

    fn name(&self) -> &str {
        &self.entry.name
    }

    /// Opens a fresh connection and replaces the cached one.
    ///
    /// On failure the cached connection and the state are left untouched.
    fn reconnect(&mut self) -> Result<&mut Box<dyn DbConnection>> {
        let conn = open_connection(&self.entry, self.connector.as_ref())?;
        self.state = SlotState::Connected;
        self.connects += 1;
        debug!(database = self.name(), connects = self.connects, "slot connected");
        Ok(self.connection.insert(conn))
    }

    /// Probes the cached connection, demoting the slot to `Broken` on failure.
    fn probe(&mut self) -> bool {
        let alive = match self.connection.as_mut() {
            Some(conn) => conn.ping(),
            None => false,
        };
        if !alive && self.state == SlotState::Connected {
            self.connection = None;
            self.state = SlotState::Broken;
        }
        alive
    }

    /// Makes sure a live connection is cached, reconnecting at most once.
    fn ensure_live(&mut self) -> Result<&mut Box<dyn DbConnection>> {
        if let Some(mut conn) = self.connection.take() {
            if conn.ping() {
                return Ok(self.connection.insert(conn));
            }
            self.state = SlotState::Broken;
        }
        if self.state == SlotState::Broken {
            info!(database = self.name(), "liveness probe failed; reconnecting");
        }
        self.reconnect()
    }

    fn disconnect(&mut self) {
        self.connection = None;
        self.state = SlotState::Disconnected;
    }

    fn status(&self) -> SlotStatus {
        SlotStatus {
            name: self.entry.name.clone(),
            backend: self.entry.backend,
            source: self.entry.source.describe(),
            state: self.state,
            connects: self.connects,
        }
    }
}

/// Lazily connecting registry of named databases.
///
/// The pool is `Sync`; every slot has its own lock, so callers working on
/// different names never wait on each other.
pub struct ConnectionPool {
    slots: HashMap<String, Mutex<Slot>>,
    order: Vec<String>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("databases", &self.order)
            .finish()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionPool {
    /// Creates an empty pool
    pub fn new() -> Self {
        ConnectionPool {
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Creates a pool holding the three default file-backed MySQL databases.
    pub fn with_defaults(base_dir: &Path) -> Self {
        let mut pool = Self::new();
        for name in DEFAULT_DATABASES {
            let entry = DatabaseEntry::file_backed(base_dir, name);
            let connector = entry.backend.connector();
            pool.insert(entry, connector);
        }
        pool
    }

    /// Registers an entry using its backend's connector.
    pub fn register(&mut self, entry: DatabaseEntry) -> Result<()> {
        let connector = entry.backend.connector();
        self.register_with_connector(entry, connector)
    }

    /// Registers an entry with an explicit connector.
    pub fn register_with_connector(
        &mut self,
        entry: DatabaseEntry,
        connector: Arc<dyn Connector>,
    ) -> Result<()> {
        if entry.name.is_empty() {
            return Err(MultiDbError::Config("database name must not be empty".to_string()));
        }
        if self.slots.contains_key(&entry.name) {
            return Err(MultiDbError::Config(format!(
                "database {} is registered twice",
                entry.name
            )));
        }
        self.insert(entry, connector);
        Ok(())
    }

    /// Adds a slot for a name that is known to be new.
    fn insert(&mut self, entry: DatabaseEntry, connector: Arc<dyn Connector>) {
        let name = entry.name.clone();
        self.slots.insert(name.clone(), Mutex::new(Slot::new(entry, connector)));
        self.order.push(name);
    }

    /// Registered names, in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    fn slot(&self, name: &str) -> Result<MutexGuard<'_, Slot>> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| MultiDbError::UnknownDatabase(name.to_string()))?;
        slot.lock()
            .map_err(|_| MultiDbError::Lock(format!("slot {} is poisoned", name)))
    }

    /// Opens a new connection for `name`, replacing any cached one.
    pub fn connect(&self, name: &str) -> Result<()> {
        self.slot(name)?.reconnect()?;
        Ok(())
    }

    /// Runs `sql` against `name`, connecting or reconnecting first when needed.
    ///
    /// # Errors
    ///
    /// - `UnknownDatabase` if `name` is not registered
    /// - `Connect`/`Credentials` if no live connection could be obtained
    /// - `Query` if the statement failed; the failure is also logged
    pub fn query(&self, name: &str, sql: &str) -> Result<QueryResult> {
        let mut slot = self.slot(name)?;
        let conn = slot.ensure_live()?;
        conn.execute(sql).map_err(|message| {
            report_query_error(name, &message, sql);
            MultiDbError::Query {
                name: name.to_string(),
                message,
                query: sql.to_string(),
            }
        })
    }

    /// Probes the cached connection without reconnecting.
    ///
    /// Returns `false` when nothing is cached or the probe fails.
    pub fn ping(&self, name: &str) -> Result<bool> {
        Ok(self.slot(name)?.probe())
    }

    /// Drops the cached connection for `name`.
    pub fn disconnect(&self, name: &str) -> Result<()> {
        self.slot(name)?.disconnect();
        Ok(())
    }

    pub fn state(&self, name: &str) -> Result<SlotState> {
        Ok(self.slot(name)?.state)
    }

    /// Number of successful connects made for `name`
    pub fn connect_count(&self, name: &str) -> Result<u64> {
        Ok(self.slot(name)?.connects)
    }

    /// Status of every slot, in registration order
    pub fn status(&self) -> Result<Vec<SlotStatus>> {
        self.order
            .iter()
            .map(|name| Ok(self.slot(name)?.status()))
            .collect()
    }
}

/// Logs a failed statement together with the SQL that caused it.
pub fn report_query_error(name: &str, message: &str, sql: &str) {
    warn!(database = name, error = message, query = sql, "Query failed");
}
