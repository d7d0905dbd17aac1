//! Command line interface for dbscaffold.
//!
//! Argument parsing and the translation from arguments to core types live
//! here so they can be tested without spawning the binary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dbscaffold_core::{AppConfiguration, ConnectionParams, Dialect};
use std::path::{Path, PathBuf};

/// Environment variable read for the database password.
pub const PASSWORD_ENV: &str = "DBSCAFFOLD_PASSWORD";

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "dbscaffold")]
#[command(about = "Generate CRUD applications from live database schemas")]
#[command(version)]
#[command(long_about = "
dbscaffold - CRUD application generator

Reads the schema of a live database and renders a PHP/HTML/JS CRUD
application for the selected tables and custom queries.

SUPPORTED DATABASES:
- SQLite (--dialect sqlite --file shop.db)
- MySQL (--dialect mysql --host db --database shop)
- PostgreSQL (--dialect postgresql --host db --database shop --schema public)

The password is read from DBSCAFFOLD_PASSWORD or prompted for with
--ask-password. It is never accepted as a plain argument.

EXAMPLES:
  dbscaffold analyze --dialect sqlite --file shop.db
  dbscaffold generate --config app.json --output-dir generated-app
  dbscaffold query --dialect mysql --database shop --username app --ask-password \"SELECT 1\"
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Introspect a database and print the discovered schema
    Analyze(ConnectionArgs),
    /// Test a database connection
    Test(ConnectionArgs),
    /// Generate an application from a configuration file
    Generate(GenerateArgs),
    /// Run a SQL statement verbatim and print the result
    Query(QueryArgs),
    /// List supported database types
    List,
}

/// Flags shared by every command
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logging except errors")]
    pub quiet: bool,
}

/// Connection descriptor flags
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Database dialect
    #[arg(short, long, value_name = "DIALECT", help = "sqlite, mysql or postgresql")]
    pub dialect: String,

    /// SQLite database file
    #[arg(long, value_name = "FILE")]
    pub file: Option<String>,

    /// Server host
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Database name
    #[arg(long)]
    pub database: Option<String>,

    /// User name
    #[arg(short, long)]
    pub username: Option<String>,

    /// PostgreSQL catalog schema
    #[arg(long)]
    pub schema: Option<String>,

    /// Prompt for the password instead of reading DBSCAFFOLD_PASSWORD
    #[arg(long)]
    pub ask_password: bool,
}

impl ConnectionArgs {
    /// Builds connection parameters with an already resolved password.
    pub fn to_params(&self, password: Option<String>) -> ConnectionParams {
        ConnectionParams {
            file: self.file.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.username.clone(),
            password,
            schema: self.schema.clone(),
        }
    }
}

/// `generate` flags
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Application configuration JSON
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Directory the `app_<id>` folder is created in
    #[arg(short, long, value_name = "DIR", default_value = "generated-app")]
    pub output_dir: PathBuf,

    /// Prompt for the password instead of reading DBSCAFFOLD_PASSWORD
    #[arg(long)]
    pub ask_password: bool,
}

/// `query` flags
#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Statement to run
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// Report the affected row count instead of returning rows
    #[arg(long)]
    pub execute: bool,

    /// Open SQLite files writable (needed with --execute)
    #[arg(long)]
    pub writable: bool,
}

/// Resolves the password from the prompt or the environment.
///
/// The prompt wins when `ask` is set; empty values count as absent.
///
/// # Errors
/// Returns an error if the prompt cannot be read.
pub fn resolve_password<F>(ask: bool, env_value: Option<String>, prompt: F) -> Result<Option<String>>
where
    F: FnOnce() -> std::io::Result<String>,
{
    let password = if ask {
        Some(prompt().context("Failed to read password")?)
    } else {
        env_value
    };
    Ok(password.filter(|p| !p.is_empty()))
}

/// Loads an application configuration file.
///
/// A password in the file takes precedence over `fallback_password`.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path, fallback_password: Option<String>) -> Result<AppConfiguration> {
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    let mut config = AppConfiguration::from_json(&payload)
        .with_context(|| format!("Invalid configuration file {}", path.display()))?;
    if config.connection.password.is_none() {
        config.connection.password = fallback_password;
    }
    Ok(config)
}

/// Dialects compiled into this binary.
pub fn compiled_dialects() -> Vec<Dialect> {
    Dialect::ALL
        .into_iter()
        .filter(|d| match d {
            Dialect::Sqlite => cfg!(feature = "sqlite"),
            Dialect::MySql => cfg!(feature = "mysql"),
            Dialect::Postgres => cfg!(feature = "postgresql"),
        })
        .collect()
}
