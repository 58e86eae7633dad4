//! MySQL backend built on the synchronous `mysql` client.

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Value};
use tracing::debug;

use crate::core::db::connection::{ConnectFailure, Connector, DbConnection, DEFAULT_MYSQL_PORT};
use crate::core::db::query::{QueryResult, NULL_TEXT};
use crate::core::error::{CR_CONNECTION_ERROR, CR_UNKNOWN_ERROR};
use crate::credentials::Credentials;

/// Opens plain `mysql::Conn` handles, one per slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlConnector;

impl Connector for MysqlConnector {
    fn open(
        &self,
        credentials: &Credentials,
        port: Option<u16>,
    ) -> Result<Box<dyn DbConnection>, ConnectFailure> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(credentials.host.as_str()))
            .tcp_port(port.unwrap_or(DEFAULT_MYSQL_PORT))
            .db_name(non_empty(&credentials.database))
            .user(non_empty(&credentials.user))
            .pass(non_empty(&credentials.password));

        let conn = Conn::new(opts).map_err(connect_failure)?;
        debug!(connection_id = conn.connection_id(), "mysql connection established");
        Ok(Box::new(MysqlConnection { conn }))
    }
}

pub struct MysqlConnection {
    conn: Conn,
}

impl DbConnection for MysqlConnection {
    fn ping(&mut self) -> bool {
        self.conn.ping()
    }

    fn execute(&mut self, sql: &str) -> Result<QueryResult, String> {
        let mut result = self.conn.query_iter(sql).map_err(|e| e.to_string())?;

        let columns: Vec<String> = result
            .columns()
            .as_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();

        let mut rows = Vec::new();
        for row in result.by_ref() {
            let row = row.map_err(|e| e.to_string())?;
            rows.push(row.unwrap().into_iter().map(format_value).collect());
        }

        if columns.is_empty() {
            return Ok(QueryResult::modified(
                result.affected_rows(),
                result.last_insert_id(),
            ));
        }

        Ok(QueryResult::new(columns, rows))
    }
}

fn non_empty(field: &str) -> Option<&str> {
    if field.is_empty() {
        None
    } else {
        Some(field)
    }
}

/// Maps a client error to the (code, message) pair logged on connect failure.
fn connect_failure(err: mysql::Error) -> ConnectFailure {
    match &err {
        mysql::Error::MySqlError(e) => ConnectFailure {
            code: e.code,
            message: e.message.clone(),
        },
        // Transport and handshake problems: the server was never reached.
        mysql::Error::IoError(_) | mysql::Error::DriverError(_) => ConnectFailure {
            code: CR_CONNECTION_ERROR,
            message: err.to_string(),
        },
        _ => ConnectFailure {
            code: CR_UNKNOWN_ERROR,
            message: err.to_string(),
        },
    }
}

/// Formats a MySQL value for display
fn format_value(value: Value) -> String {
    match value {
        Value::NULL => NULL_TEXT.to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Date(y, m, d, 0, 0, 0, 0) => format!("{:04}-{:02}-{:02}", y, m, d),
        Value::Date(y, m, d, h, i, s, 0) => {
            format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, i, s)
        }
        Value::Date(y, m, d, h, i, s, us) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            y, m, d, h, i, s, us
        ),
        Value::Time(neg, days, h, i, s, us) => {
            let sign = if neg { "-" } else { "" };
            let hours = days * 24 + u32::from(h);
            if us == 0 {
                format!("{}{:02}:{:02}:{:02}", sign, hours, i, s)
            } else {
                format!("{}{:02}:{:02}:{:02}.{:06}", sign, hours, i, s, us)
            }
        }
    }
}
