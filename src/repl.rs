use crate::core::db::ConnectionPool;
use crate::core::Result;
use crate::render::{render_json, render_table};
use std::io::{BufRead, Write};

/// Represents a parsed REPL command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Use(String),
    Dbs,
    Status,
    Ping,
    Connect,
    Disconnect,
    Json,
    Help,
    Quit,
    Sql(String),
    Unknown(String),
}

/// Parses a user input string into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a command.
/// Otherwise, it is treated as a SQL query.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if !input.starts_with(':') {
        return Command::Sql(input.to_string());
    }
    let parts: Vec<&str> = input[1..].split_whitespace().collect();
    match parts.as_slice() {
        ["use", name] => Command::Use(name.to_string()),
        ["dbs"] => Command::Dbs,
        ["status"] => Command::Status,
        ["ping"] => Command::Ping,
        ["connect"] => Command::Connect,
        ["disconnect"] => Command::Disconnect,
        ["json"] => Command::Json,
        ["help"] => Command::Help,
        ["quit"] | ["q"] => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

const HELP: &str = "Available commands:
  :use <name>   - Select the database queries run against
  :dbs          - List registered databases
  :status       - Show connection state of every database
  :ping         - Probe the current database connection
  :connect      - Open a fresh connection to the current database
  :disconnect   - Drop the cached connection of the current database
  :json         - Toggle JSON output
  :help         - Show this help
  :quit         - Exit

Anything else is sent as SQL to the current database.";

/// Interactive state: the selected database and output mode.
#[derive(Debug, Default)]
pub struct Session {
    pub current: Option<String>,
    pub json: bool,
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Print(String),
    Quit,
}

impl Session {
    pub fn new(current: Option<String>, json: bool) -> Self {
        Session { current, json }
    }

    fn current(&self) -> std::result::Result<&str, String> {
        self.current
            .as_deref()
            .ok_or_else(|| "No database selected; use :use <name>".to_string())
    }

    /// Executes one command. Failures are rendered into the output text.
    pub fn handle(&mut self, pool: &ConnectionPool, command: Command) -> Outcome {
        let text = match self.dispatch(pool, command) {
            Ok(Some(text)) => text,
            Ok(None) => return Outcome::Quit,
            Err(text) => format!("Error: {}", text),
        };
        Outcome::Print(text)
    }

    fn dispatch(
        &mut self,
        pool: &ConnectionPool,
        command: Command,
    ) -> std::result::Result<Option<String>, String> {
        let text = match command {
            Command::Quit => return Ok(None),
            Command::Help => HELP.to_string(),
            Command::Use(name) => {
                if !pool.contains(&name) {
                    return Err(format!("Unknown database: {}", name));
                }
                let text = format!("Using database {}", name);
                self.current = Some(name);
                text
            }
            Command::Dbs => pool.names().join("\n"),
            Command::Status => pool
                .status()
                .map_err(|e| e.to_string())?
                .iter()
                .map(|s| {
                    format!(
                        "{} [{}] {} connects={} ({})",
                        s.name,
                        s.backend.as_str(),
                        s.state,
                        s.connects,
                        s.source
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Ping => {
                let name = self.current()?;
                let alive = pool.ping(name).map_err(|e| e.to_string())?;
                format!("{}: {}", name, if alive { "alive" } else { "not connected" })
            }
            Command::Connect => {
                let name = self.current()?;
                pool.connect(name).map_err(|e| e.to_string())?;
                format!("Connected to {}", name)
            }
            Command::Disconnect => {
                let name = self.current()?;
                pool.disconnect(name).map_err(|e| e.to_string())?;
                format!("Disconnected from {}", name)
            }
            Command::Json => {
                self.json = !self.json;
                format!("JSON output {}", if self.json { "on" } else { "off" })
            }
            Command::Sql(sql) => {
                let name = self.current()?;
                let result = pool.query(name, &sql).map_err(|e| e.to_string())?;
                if self.json {
                    render_json(&result).map_err(|e| e.to_string())?
                } else {
                    render_table(&result)
                }
            }
            Command::Unknown(input) => format!("Unknown command: {} (try :help)", input),
        };
        Ok(Some(text))
    }
}

/// Runs the prompt loop until `:quit` or end of input.
pub fn run_repl<R: BufRead, W: Write>(
    pool: &ConnectionPool,
    session: &mut Session,
    input: R,
    mut output: W,
) -> Result<()> {
    writeln!(output, "multidb REPL. Type :help for commands, :quit to exit.")?;
    let mut lines = input.lines();
    loop {
        let prompt = session.current.as_deref().unwrap_or("multidb");
        write!(output, "{}> ", prompt)?;
        output.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match session.handle(pool, parse_command(trimmed)) {
            Outcome::Print(text) => writeln!(output, "{}", text)?,
            Outcome::Quit => break,
        }
    }
    Ok(())
}
