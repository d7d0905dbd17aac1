//! MySQL catalog access.
//!
//! Columns come from `SHOW COLUMNS` (the `DESCRIBE` shape): the primary key
//! is marked by `Key = 'PRI'` and nullability by `Null = 'YES'`.
//!
//! MySQL 8 reports several catalog columns as binary strings, so every text
//! field is decoded leniently through [`text`].

use super::SchemaCatalog;
use crate::error::{Result, ScaffoldError};
use crate::models::{ColumnDescriptor, Dialect, ForeignKeyDescriptor};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, mysql::MySqlRow};

/// One row of `SHOW COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRow {
    /// `Field`
    pub field: String,
    /// `Type`
    pub column_type: String,
    /// `Null`: `YES` or `NO`
    pub null: String,
    /// `Key`: `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    /// `Default`
    pub default: Option<String>,
}

/// One foreign key row of `information_schema.KEY_COLUMN_USAGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumnUsageRow {
    /// `COLUMN_NAME`
    pub column_name: String,
    /// `REFERENCED_TABLE_NAME`
    pub referenced_table_name: String,
    /// `REFERENCED_COLUMN_NAME`
    pub referenced_column_name: String,
}

/// Maps `SHOW COLUMNS` rows to column descriptors.
pub fn normalize_columns(rows: Vec<DescribeRow>) -> Vec<ColumnDescriptor> {
    rows.into_iter()
        .map(|r| {
            ColumnDescriptor::new(
                r.field,
                &r.column_type,
                r.null.eq_ignore_ascii_case("YES"),
                r.default,
                r.key.eq_ignore_ascii_case("PRI"),
            )
        })
        .collect()
}

/// Maps key usage rows to foreign key descriptors.
pub fn normalize_foreign_keys(rows: Vec<KeyColumnUsageRow>) -> Vec<ForeignKeyDescriptor> {
    rows.into_iter()
        .map(|r| ForeignKeyDescriptor {
            column: r.column_name,
            referenced_table: r.referenced_table_name,
            referenced_column: r.referenced_column_name,
        })
        .collect()
}

/// Quotes a table name for `SHOW` statements, which cannot take binds.
fn quote(table: &str) -> String {
    Dialect::MySql.quote_identifier(table)
}

/// Reads a text column that may arrive as `VARCHAR` or `VARBINARY`.
fn text<I>(row: &MySqlRow, index: I, table: Option<&str>) -> Result<Option<String>>
where
    I: sqlx::ColumnIndex<MySqlRow> + Copy + std::fmt::Display,
{
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value);
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .map(|bytes| bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
        .map_err(|e| ScaffoldError::parse_field(&index.to_string(), table, e))
}

fn required_text<I>(row: &MySqlRow, index: I, table: Option<&str>) -> Result<String>
where
    I: sqlx::ColumnIndex<MySqlRow> + Copy + std::fmt::Display,
{
    Ok(text(row, index, table)?.unwrap_or_default())
}

/// Catalog strategy for MySQL, scoped to the connection's current database.
pub struct MySqlCatalog<'a> {
    pool: &'a MySqlPool,
}

impl<'a> MySqlCatalog<'a> {
    /// Creates a catalog over an open pool.
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    async fn show_columns(&self, table: &str) -> Result<Vec<DescribeRow>> {
        let rows = sqlx::query(&format!("SHOW COLUMNS FROM {}", quote(table)))
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(format!("Failed to describe '{}'", table), e)
            })?;

        rows.iter()
            .map(|row| {
                Ok(DescribeRow {
                    field: required_text(row, "Field", Some(table))?,
                    column_type: required_text(row, "Type", Some(table))?,
                    null: required_text(row, "Null", Some(table))?,
                    key: required_text(row, "Key", Some(table))?,
                    default: text(row, "Default", Some(table))?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SchemaCatalog for MySqlCatalog<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'")
            .fetch_all(self.pool)
            .await
            .map_err(|e| ScaffoldError::introspection_failed("Failed to enumerate MySQL tables", e))?;

        // The first column is named after the database (`Tables_in_<db>`).
        rows.iter().map(|row| required_text(row, 0_usize, None)).collect()
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(normalize_columns(self.show_columns(table).await?))
    }

    async fn find_primary_key(&self, table: &str) -> Result<Option<String>> {
        let rows = sqlx::query(&format!(
            "SHOW KEYS FROM {} WHERE Key_name = 'PRIMARY'",
            quote(table)
        ))
        .fetch_all(self.pool)
        .await
        .map_err(|e| {
            ScaffoldError::introspection_failed(
                format!("Failed to read primary key of '{}'", table),
                e,
            )
        })?;

        // SHOW KEYS lists key parts in Seq_in_index order.
        rows.first()
            .map(|row| required_text(row, "Column_name", Some(table)))
            .transpose()
    }

    async fn find_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(REFERENCED_TABLE_NAME AS CHAR) AS referenced_table_name,
                CAST(REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column_name
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
              AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(
                    format!("Failed to read foreign keys of '{}'", table),
                    e,
                )
            })?;

        let raw = rows
            .iter()
            .map(|row| {
                Ok(KeyColumnUsageRow {
                    column_name: required_text(row, "column_name", Some(table))?,
                    referenced_table_name: required_text(row, "referenced_table_name", Some(table))?,
                    referenced_column_name: required_text(row, "referenced_column_name", Some(table))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(normalize_foreign_keys(raw))
    }
}
