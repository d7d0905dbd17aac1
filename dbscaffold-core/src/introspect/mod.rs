//! Schema introspection.
//!
//! Each dialect implements [`SchemaCatalog`], a four-operation view of its
//! system catalog. [`introspect_catalog`] composes those operations into a
//! [`SchemaSnapshot`] the same way for every dialect:
//!
//! 1. list base tables in catalog order (system tables excluded)
//! 2. per table, describe columns, then find the primary key, then the
//!    foreign keys
//! 3. derive relationships from the foreign keys
//!
//! Any catalog failure aborts the whole run; partial snapshots are never
//! returned.

use crate::connection::{Connection, DatabasePool};
use crate::error::Result;
use crate::models::{ColumnDescriptor, Dialect, ForeignKeyDescriptor, SchemaSnapshot, TableDescriptor};
use async_trait::async_trait;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Dialect-specific access to the system catalog.
///
/// Implementations must report tables and columns in catalog order and must
/// return column descriptors whose primary key flags are already
/// trustworthy, running whatever extra catalog query their dialect needs.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Dialect this catalog reads.
    fn dialect(&self) -> Dialect;

    /// Lists user base tables.
    ///
    /// # Errors
    /// Returns an introspection error if the catalog query fails.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Describes the columns of one table in ordinal order.
    ///
    /// # Errors
    /// Returns an introspection error if the catalog query fails.
    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Finds the first primary key column of one table, in key order.
    ///
    /// # Errors
    /// Returns an introspection error if the catalog query fails.
    async fn find_primary_key(&self, table: &str) -> Result<Option<String>>;

    /// Lists the declared foreign keys of one table.
    ///
    /// # Errors
    /// Returns an introspection error if the catalog query fails.
    async fn find_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>>;
}

/// Builds a snapshot from any catalog.
///
/// # Errors
/// Propagates the first catalog error.
pub async fn introspect_catalog(catalog: &dyn SchemaCatalog) -> Result<SchemaSnapshot> {
    let dialect = catalog.dialect();
    tracing::info!("Starting {} schema introspection", dialect.display_name());

    let names = catalog.list_tables().await?;
    tracing::debug!("Found {} tables", names.len());

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = catalog.describe_columns(&name).await?;
        let primary_key = catalog.find_primary_key(&name).await?;
        let foreign_keys = catalog.find_foreign_keys(&name).await?;

        tracing::debug!(
            "Table '{}': {} columns, primary key {:?}, {} foreign keys",
            name,
            columns.len(),
            primary_key,
            foreign_keys.len()
        );
        tables.push(TableDescriptor::new(name, columns, primary_key, foreign_keys));
    }

    let snapshot = SchemaSnapshot::new(dialect, tables);
    tracing::info!(
        "✓ Introspection completed: {} tables, {} relationships",
        snapshot.total_tables(),
        snapshot.relationships().len()
    );
    Ok(snapshot)
}

/// Selects the catalog strategy for a connection.
///
/// # Errors
/// Returns a connection error if the connection is closed.
pub fn catalog_for(connection: &Connection) -> Result<Box<dyn SchemaCatalog + '_>> {
    let catalog: Box<dyn SchemaCatalog + '_> = match connection.pool()? {
        #[cfg(feature = "sqlite")]
        DatabasePool::Sqlite(pool) => Box::new(sqlite::SqliteCatalog::new(pool)),
        #[cfg(feature = "mysql")]
        DatabasePool::MySql(pool) => Box::new(mysql::MySqlCatalog::new(pool)),
        #[cfg(feature = "postgresql")]
        DatabasePool::Postgres(pool) => {
            Box::new(postgres::PostgresCatalog::new(pool, connection.schema()))
        }
    };
    Ok(catalog)
}

/// Introspects the database behind an open connection.
///
/// The connection stays open; closing it is the caller's job.
///
/// # Errors
/// Returns a connection error for a closed connection and an introspection
/// error for any failed catalog query.
pub async fn introspect(connection: &Connection) -> Result<SchemaSnapshot> {
    let catalog = catalog_for(connection)?;
    introspect_catalog(catalog.as_ref()).await
}
