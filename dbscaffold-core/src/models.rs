//! Canonical, dialect-independent schema model.
//!
//! Introspection for every supported dialect produces the same
//! [`SchemaSnapshot`] shape. The serialized form of a snapshot is the
//! discovered-schema document handed to analysis-only callers:
//!
//! ```json
//! {
//!   "tables": { "orders": { "columns": [], "primaryKey": "id", "foreignKeys": [], "indexes": [] } },
//!   "relationships": [],
//!   "total_tables": 1,
//!   "database_type": "sqlite"
//! }
//! ```

use crate::error::{Result, ScaffoldError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// Embedded file database
    #[serde(rename = "sqlite")]
    Sqlite,
    /// MySQL and MariaDB
    #[serde(rename = "mysql")]
    MySql,
    /// PostgreSQL
    #[serde(rename = "postgresql", alias = "postgres")]
    Postgres,
}

impl Dialect {
    /// All dialects, in the order they are listed to users.
    pub const ALL: [Self; 3] = [Self::Sqlite, Self::MySql, Self::Postgres];

    /// Canonical tag used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::Postgres => "postgresql",
        }
    }

    /// Human readable engine name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }

    /// Default TCP port for client-server dialects.
    pub const fn default_port(self) -> Option<u16> {
        match self {
            Self::Sqlite => None,
            Self::MySql => Some(3306),
            Self::Postgres => Some(5432),
        }
    }

    /// Quotes an identifier for use in generated SQL.
    ///
    /// Embedded quote characters are doubled.
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", identifier.replace('`', "``")),
            Self::Sqlite | Self::Postgres => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ScaffoldError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgresql" | "postgres" | "pgsql" => Ok(Self::Postgres),
            _ => Err(ScaffoldError::unsupported_dialect(tag)),
        }
    }
}

/// A single column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Declared type, lower-cased and whitespace-normalized
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Raw default expression as reported by the dialect
    pub default: Option<String>,
    /// Whether the column participates in the primary key
    #[serde(rename = "primaryKey")]
    pub is_primary_key: bool,
}

impl ColumnDescriptor {
    /// Creates a column descriptor, normalizing the declared type.
    pub fn new(
        name: impl Into<String>,
        declared_type: &str,
        nullable: bool,
        default: Option<String>,
        is_primary_key: bool,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: normalize_type(declared_type),
            // Primary key columns are never nullable, whatever the catalog says.
            nullable: nullable && !is_primary_key,
            default,
            is_primary_key,
        }
    }
}

/// Lower-cases a declared type and collapses runs of whitespace.
pub fn normalize_type(declared_type: &str) -> String {
    declared_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A declared foreign key on one column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Referencing column in the owning table
    pub column: String,
    /// Referenced table
    pub referenced_table: String,
    /// Referenced column
    pub referenced_column: String,
}

/// Reserved for index metadata; never populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name
    pub name: String,
}

/// Normalized description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Table name; the snapshot map key carries it in serialized form
    #[serde(skip)]
    pub name: String,
    /// Columns in catalog ordinal order
    pub columns: Vec<ColumnDescriptor>,
    /// First detected primary key column
    #[serde(rename = "primaryKey")]
    pub primary_key: Option<String>,
    /// Declared foreign keys
    #[serde(rename = "foreignKeys")]
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    /// Always empty
    pub indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    /// Composes a table from its introspected facts.
    ///
    /// The column-level primary key flags are reconciled with the
    /// table-level key so that both views always agree.
    pub fn new(
        name: impl Into<String>,
        mut columns: Vec<ColumnDescriptor>,
        primary_key: Option<String>,
        foreign_keys: Vec<ForeignKeyDescriptor>,
    ) -> Self {
        if let Some(pk) = primary_key.as_deref() {
            for column in columns.iter_mut().filter(|c| c.name == pk) {
                column.is_primary_key = true;
                column.nullable = false;
            }
        }
        let primary_key = primary_key.or_else(|| {
            columns
                .iter()
                .find(|c| c.is_primary_key)
                .map(|c| c.name.clone())
        });

        Self {
            name: name.into(),
            columns,
            primary_key,
            foreign_keys,
            indexes: Vec::new(),
        }
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column used to address a single row.
    ///
    /// Falls back to `id` when no primary key was detected.
    pub fn identity_column(&self) -> &str {
        self.primary_key.as_deref().unwrap_or("id")
    }
}

/// One foreign key seen from the schema as a whole.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Table owning the foreign key
    pub from_table: String,
    /// Referencing column
    pub from_column: String,
    /// Referenced table
    pub to_table: String,
    /// Referenced column
    pub to_column: String,
}

/// Immutable result of one introspection run.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaSnapshot {
    tables: IndexMap<String, TableDescriptor>,
    relationships: Vec<RelationshipEdge>,
    total_tables: usize,
    database_type: Dialect,
}

impl SchemaSnapshot {
    /// Builds a snapshot from tables in catalog order.
    ///
    /// Relationships are derived from the tables' foreign keys.
    pub fn new(database_type: Dialect, tables: Vec<TableDescriptor>) -> Self {
        let tables: IndexMap<String, TableDescriptor> = tables
            .into_iter()
            .map(|table| (table.name.clone(), table))
            .collect();
        let relationships = crate::relationships::resolve_tables(&tables);

        Self {
            total_tables: tables.len(),
            tables,
            relationships,
            database_type,
        }
    }

    /// Tables keyed by name, in catalog order.
    pub const fn tables(&self) -> &IndexMap<String, TableDescriptor> {
        &self.tables
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    /// Relationships derived at construction time.
    pub fn relationships(&self) -> &[RelationshipEdge] {
        &self.relationships
    }

    /// Number of introspected tables.
    pub const fn total_tables(&self) -> usize {
        self.total_tables
    }

    /// Dialect the snapshot was read from.
    pub const fn database_type(&self) -> Dialect {
        self.database_type
    }

    /// Compares two snapshots ignoring table order and the dialect tag.
    pub fn structurally_eq(&self, other: &Self) -> bool {
        if self.total_tables != other.total_tables || self.tables.len() != other.tables.len() {
            return false;
        }
        let same_tables = self
            .tables
            .iter()
            .all(|(name, table)| other.tables.get(name) == Some(table));
        if !same_tables {
            return false;
        }

        let mut ours = self.relationships.clone();
        let mut theirs = other.relationships.clone();
        ours.sort();
        theirs.sort();
        ours == theirs
    }
}

impl PartialEq for SchemaSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.database_type == other.database_type && self.structurally_eq(other)
    }
}

impl Eq for SchemaSnapshot {}
