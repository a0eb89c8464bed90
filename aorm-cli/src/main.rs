//! CLI entry point for aorm

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use aorm::{Executor, MySqlDriver, PoolConfig, PoolManager, Value};

#[derive(Parser)]
#[command(name = "aorm")]
#[command(about = "Run statements through an aorm MySQL connection pool")]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Database port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Login user (overrides config)
    #[arg(short, long)]
    user: Option<String>,

    /// Login password (overrides config)
    #[arg(short, long)]
    password: Option<String>,

    /// Schema to connect to (overrides config)
    #[arg(short, long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the pool, print its status and close it
    Ping,
    /// Run a read and print each row as a JSON line
    Query {
        sql: String,
        /// Positional argument for a `?` marker (repeatable)
        #[arg(short, long = "arg")]
        args: Vec<String>,
        /// Return at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Run a write and print the affected-row count
    Execute {
        sql: String,
        /// Positional argument for a `?` marker (repeatable)
        #[arg(short, long = "arg")]
        args: Vec<String>,
        /// Wrap the statement in its own transaction
        #[arg(long)]
        no_autocommit: bool,
    },
}

/// Interpret a command-line argument: `null`, an integer, a float, or text.
fn parse_arg(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(v) = raw.parse::<i64>() {
        Value::Int(v)
    } else if let Ok(v) = raw.parse::<f64>() {
        Value::Float(v)
    } else {
        Value::Text(raw.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (before logging, so we can use config.log_level)
    let mut config = PoolConfig::load(cli.config.as_deref())?;

    // Initialize logging
    // Priority: RUST_LOG env var > config.log_level > default (debug for dev, info for release)
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let log_level = config.log_level.as_deref().unwrap_or(default_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.user.is_some() {
        config.user = cli.user;
    }
    if cli.password.is_some() {
        config.password = cli.password;
    }
    if cli.database.is_some() {
        config.database = cli.database;
    }

    let manager = PoolManager::new();
    let pool = manager.initialize(MySqlDriver, config).await?;

    let outcome = run(&pool, cli.command).await;

    // Always drain the pool, even when the command failed
    manager.shutdown().await?;
    outcome
}

async fn run(pool: &aorm::Pool<MySqlDriver>, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => {
            let status = pool.status();
            println!(
                "ok: {} open, {} idle, {} in use (min {}, max {})",
                status.size, status.idle, status.in_use, status.min_size, status.max_size
            );
        }
        Commands::Query { sql, args, limit } => {
            let args = args.iter().map(|a| parse_arg(a)).collect();
            let rows = pool.query(&sql, args, limit).await?;
            for row in &rows {
                println!("{}", serde_json::to_string(row)?);
            }
            info!(rows = rows.len(), "query finished");
        }
        Commands::Execute {
            sql,
            args,
            no_autocommit,
        } => {
            let args = args.iter().map(|a| parse_arg(a)).collect();
            let affected = pool.execute(&sql, args, !no_autocommit).await?;
            println!("{}", affected);
        }
    }
    Ok(())
}
