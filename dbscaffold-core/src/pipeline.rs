//! Request-scoped orchestration.
//!
//! Every operation owns exactly one connection for its duration and closes
//! it before returning, on success and on failure alike.

use crate::config::{AppConfiguration, ConnectionParams};
use crate::connection::{Connection, ConnectionProvider, ConnectionSettings};
use crate::error::Result;
use crate::generator::{ArtifactGenerator, ArtifactWriter, EntityKind};
use crate::introspect::introspect;
use crate::models::{Dialect, SchemaSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Summary of a successful connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    /// Dialect connected to
    pub database_type: Dialect,
    /// Redacted description of the target
    pub target: String,
}

/// Summary of a generated application.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Directory holding the application
    pub output_dir: PathBuf,
    /// Number of files written
    pub files_written: usize,
    /// Tables with CRUD views
    pub tables: Vec<String>,
    /// Query ids with read-only views
    pub queries: Vec<String>,
    /// Completion time
    pub generated_at: DateTime<Utc>,
}

/// Runs analysis, generation and query previews.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    provider: ConnectionProvider,
}

impl Pipeline {
    /// Creates a pipeline with custom connection settings.
    pub const fn new(settings: ConnectionSettings) -> Self {
        Self {
            provider: ConnectionProvider::new(settings),
        }
    }

    /// Connects, introspects and disconnects.
    ///
    /// An unknown `dialect_tag` fails before any I/O.
    ///
    /// # Errors
    /// Returns connection errors for the open step and introspection errors
    /// for failed catalog queries.
    pub async fn analyze(&self, dialect_tag: &str, params: &ConnectionParams) -> Result<SchemaSnapshot> {
        let mut connection = self.provider.open_tagged(dialect_tag, params).await?;
        let result = introspect(&connection).await;
        connection.close().await;
        result
    }

    /// Connects, pings and disconnects.
    ///
    /// # Errors
    /// Returns a connection error if the database cannot be reached.
    pub async fn test_connection(
        &self,
        dialect_tag: &str,
        params: &ConnectionParams,
    ) -> Result<ConnectionReport> {
        let mut connection = self.provider.open_tagged(dialect_tag, params).await?;
        let result = connection.ping().await.map(|()| report(&connection));
        connection.close().await;
        result
    }

    /// Runs one SQL statement verbatim and returns its rows.
    ///
    /// # Errors
    /// Returns connection errors for the open step and introspection errors
    /// when the statement fails.
    pub async fn run_query(
        &self,
        dialect_tag: &str,
        params: &ConnectionParams,
        sql: &str,
    ) -> Result<Vec<Map<String, Value>>> {
        let mut connection = self.provider.open_tagged(dialect_tag, params).await?;
        let result = connection.fetch_rows(sql).await;
        connection.close().await;
        result
    }

    /// Executes one statement verbatim and returns the affected row count.
    ///
    /// SQLite connections are read-only unless the pipeline was built with
    /// [`ConnectionSettings::with_read_only`] set to `false`.
    ///
    /// # Errors
    /// Returns connection errors for the open step and introspection errors
    /// when the statement fails.
    pub async fn execute_statement(
        &self,
        dialect_tag: &str,
        params: &ConnectionParams,
        sql: &str,
    ) -> Result<u64> {
        let mut connection = self.provider.open_tagged(dialect_tag, params).await?;
        let result = connection.execute(sql).await;
        connection.close().await;
        result
    }

    /// Introspects the configured database and writes a generated
    /// application below `output_root`.
    ///
    /// # Errors
    /// Returns the first failure of the open, introspect, generate or write
    /// steps. Nothing is written unless generation succeeded.
    pub async fn generate_application(
        &self,
        config: &AppConfiguration,
        output_root: &Path,
    ) -> Result<GenerationReport> {
        let snapshot = self.analyze(&config.database_type, &config.connection).await?;
        let set = ArtifactGenerator::generate(config, &snapshot)?;
        let written = ArtifactWriter::new(output_root).write(&set).await?;

        let names = |kind: EntityKind| {
            set.entities
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.name.clone())
                .collect::<Vec<_>>()
        };
        Ok(GenerationReport {
            output_dir: written.root,
            files_written: written.files.len(),
            tables: names(EntityKind::Table),
            queries: names(EntityKind::Query),
            generated_at: Utc::now(),
        })
    }
}

fn report(connection: &Connection) -> ConnectionReport {
    ConnectionReport {
        database_type: connection.dialect(),
        target: connection.target().to_string(),
    }
}
