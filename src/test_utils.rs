/// # Test Utilities Module
///
/// A scripted in-memory connector for exercising the pool without a server.
/// It counts connect attempts, can refuse connections, and can "kill" every
/// connection opened so far so their liveness probe fails.

use crate::core::db::connection::{ConnectFailure, Connector, DbConnection};
use crate::core::db::query::QueryResult;
use crate::credentials::Credentials;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Statements whose first word is this marker fail with a syntax error.
pub const FAILING_SQL: &str = "SELEC";

#[derive(Debug, Default)]
struct ScriptState {
    opens: AtomicU64,
    executed: AtomicU64,
    /// Connections with an id below this value fail their ping.
    alive_from: AtomicU64,
    refuse: Mutex<Option<ConnectFailure>>,
    last_credentials: Mutex<Option<Credentials>>,
}

/// Connector whose connections live entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<ScriptState>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `open` was called, successful or not.
    pub fn open_calls(&self) -> u64 {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of statements executed across all connections.
    pub fn executed(&self) -> u64 {
        self.state.executed.load(Ordering::SeqCst)
    }

    /// Makes every following `open` fail with the given code and message.
    pub fn fail_connects(&self, code: u16, message: &str) {
        *self.state.refuse.lock().unwrap() = Some(ConnectFailure {
            code,
            message: message.to_string(),
        });
    }

    /// Lets `open` succeed again.
    pub fn accept_connects(&self) {
        *self.state.refuse.lock().unwrap() = None;
    }

    /// Breaks every connection opened so far.
    pub fn kill_connections(&self) {
        let opened = self.state.opens.load(Ordering::SeqCst);
        self.state.alive_from.store(opened + 1, Ordering::SeqCst);
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.state.last_credentials.lock().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    fn open(
        &self,
        credentials: &Credentials,
        _port: Option<u16>,
    ) -> Result<Box<dyn DbConnection>, ConnectFailure> {
        let id = self.state.opens.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.last_credentials.lock().unwrap() = Some(credentials.clone());
        if let Some(failure) = self.state.refuse.lock().unwrap().clone() {
            return Err(failure);
        }
        Ok(Box::new(ScriptedConnection {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Connection that answers every statement with its own id.
struct ScriptedConnection {
    id: u64,
    state: Arc<ScriptState>,
}

impl DbConnection for ScriptedConnection {
    fn ping(&mut self) -> bool {
        self.id >= self.state.alive_from.load(Ordering::SeqCst)
    }

    fn execute(&mut self, sql: &str) -> Result<QueryResult, String> {
        self.state.executed.fetch_add(1, Ordering::SeqCst);
        if sql.split_whitespace().next() == Some(FAILING_SQL) {
            return Err(format!(
                "You have an error in your SQL syntax near '{}'",
                sql
            ));
        }
        Ok(QueryResult::new(
            vec!["connection".to_string(), "sql".to_string()],
            vec![vec![self.id.to_string(), sql.to_string()]],
        ))
    }
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a debug-level fmt subscriber installed for this thread and
/// returns everything it logged.
pub fn capture_logs<F: FnOnce()>(f: F) -> String {
    let sink = CapturedLogs::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = sink.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_the_marker_statement_fails() {
        let connector = ScriptedConnector::new();
        let mut conn = connector.open(&Credentials::default(), None).ok().unwrap();

        let result = conn.execute("SELECT 1").unwrap();
        assert_eq!(result.rows[0], vec!["1", "SELECT 1"]);
        assert!(conn.execute("  SELECT count(*) FROM runs").is_ok());
        assert!(conn.execute(&format!("{FAILING_SQL} 1")).is_err());
        assert_eq!(connector.executed(), 3);
    }

    #[test]
    fn test_capture_logs() {
        let logs = capture_logs(|| tracing::warn!(database = "exact", "slot gone"));
        assert!(logs.contains("slot gone"));
        assert!(logs.contains("database=\"exact\""));
    }
}
