use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use multidb::config::resolve_config;
use multidb::render::{render_json, render_table};
use multidb::repl::{run_repl, Session};
use multidb::{ConnectionPool, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "multidb",
    version,
    about = "Query several named MySQL databases through one lazily connecting pool"
)]
struct Cli {
    /// Configuration file (defaults to <config dir>/multidb/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Logical database to use
    #[arg(long, short = 'd')]
    database: Option<String>,

    /// Run one statement and exit
    #[arg(long, short = 'e', requires = "database")]
    execute: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    // Diagnostics go to stderr so query output stays pipeable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Failures were already logged where they happened; report once.
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let pool: ConnectionPool = resolve_config(cli.config.as_deref())?.into_pool()?;
    info!(databases = ?pool.names(), "pool ready");

    if let Some(name) = cli.database.as_deref() {
        if !pool.contains(name) {
            return Err(multidb::MultiDbError::UnknownDatabase(name.to_string()));
        }
    }

    if let (Some(name), Some(sql)) = (cli.database.as_deref(), cli.execute.as_deref()) {
        let result = pool.query(name, sql)?;
        let text = if cli.json {
            render_json(&result)?
        } else {
            render_table(&result)
        };
        println!("{}", text);
        return Ok(());
    }

    let mut session = Session::new(cli.database, cli.json);
    let stdin = io::stdin();
    run_repl(&pool, &mut session, stdin.lock(), io::stdout())
}
