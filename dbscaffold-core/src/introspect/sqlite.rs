//! SQLite catalog access.
//!
//! Tables come from `sqlite_master`; columns and foreign keys come from the
//! `table_info` and `foreign_key_list` pragmas, queried through their
//! table-valued forms so the table name can be bound.

use super::SchemaCatalog;
use crate::error::{Result, ScaffoldError};
use crate::models::{ColumnDescriptor, Dialect, ForeignKeyDescriptor};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaColumn {
    /// Column ordinal
    pub cid: i64,
    /// Column name
    pub name: String,
    /// Declared type, possibly empty
    pub declared_type: String,
    /// Non-zero when declared NOT NULL
    pub notnull: i64,
    /// Default expression text
    pub dflt_value: Option<String>,
    /// 1-based position in the primary key, 0 otherwise
    pub pk: i64,
}

/// One row of `PRAGMA foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaForeignKey {
    /// Referenced table
    pub table: String,
    /// Referencing column
    pub from: String,
    /// Referenced column; NULL when the key targets the implicit primary key
    pub to: Option<String>,
}

/// Maps pragma rows to column descriptors in ordinal order.
pub fn normalize_columns(mut rows: Vec<PragmaColumn>) -> Vec<ColumnDescriptor> {
    rows.sort_by_key(|r| r.cid);
    rows.into_iter()
        .map(|r| ColumnDescriptor::new(r.name, &r.declared_type, r.notnull == 0, r.dflt_value, r.pk > 0))
        .collect()
}

/// First column of the primary key, in key order.
///
/// `PRIMARY KEY (code, tenant)` yields `code` whatever the column order.
pub fn primary_key_from(rows: &[PragmaColumn]) -> Option<String> {
    rows.iter()
        .filter(|r| r.pk > 0)
        .min_by_key(|r| r.pk)
        .map(|r| r.name.clone())
}

/// Maps foreign key rows, resolving implicit targets through `resolve_target`.
pub fn normalize_foreign_keys<F>(rows: Vec<PragmaForeignKey>, mut resolve_target: F) -> Vec<ForeignKeyDescriptor>
where
    F: FnMut(&str) -> String,
{
    rows.into_iter()
        .map(|r| {
            let referenced_column = r
                .to
                .filter(|to| !to.is_empty())
                .unwrap_or_else(|| resolve_target(&r.table));
            ForeignKeyDescriptor {
                column: r.from,
                referenced_table: r.table,
                referenced_column,
            }
        })
        .collect()
}

/// Catalog strategy for SQLite.
pub struct SqliteCatalog<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SqliteCatalog<'a> {
    /// Creates a catalog over an open pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_info(&self, table: &str) -> Result<Vec<PragmaColumn>> {
        let rows = sqlx::query(
            r#"SELECT cid, name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1)"#,
        )
        .bind(table)
        .fetch_all(self.pool)
        .await
        .map_err(|e| {
            ScaffoldError::introspection_failed(format!("Failed to read columns of '{}'", table), e)
        })?;

        rows.iter()
            .map(|row| {
                Ok(PragmaColumn {
                    cid: get(row, "cid", table)?,
                    name: get(row, "name", table)?,
                    declared_type: get::<Option<String>>(row, "type", table)?.unwrap_or_default(),
                    notnull: get(row, "notnull", table)?,
                    dflt_value: get(row, "dflt_value", table)?,
                    pk: get(row, "pk", table)?,
                })
            })
            .collect()
    }
}

fn get<'r, T>(row: &'r SqliteRow, field: &str, table: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(field)
        .map_err(|e| ScaffoldError::parse_field(field, Some(table), e))
}

#[async_trait]
impl SchemaCatalog for SqliteCatalog<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| ScaffoldError::introspection_failed("Failed to enumerate SQLite tables", e))
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(normalize_columns(self.table_info(table).await?))
    }

    async fn find_primary_key(&self, table: &str) -> Result<Option<String>> {
        Ok(primary_key_from(&self.table_info(table).await?))
    }

    async fn find_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let rows = sqlx::query(r#"SELECT "table", "from", "to" FROM pragma_foreign_key_list(?1)"#)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(
                    format!("Failed to read foreign keys of '{}'", table),
                    e,
                )
            })?;

        let mut raw = Vec::with_capacity(rows.len());
        for row in &rows {
            raw.push(PragmaForeignKey {
                table: get(row, "table", table)?,
                from: get(row, "from", table)?,
                to: get(row, "to", table)?,
            });
        }

        // `REFERENCES parent` without a column targets the parent's primary key.
        let mut implicit_targets = Vec::new();
        for fk in raw.iter().filter(|fk| fk.to.as_deref().is_none_or(str::is_empty)) {
            let target = primary_key_from(&self.table_info(&fk.table).await?)
                .unwrap_or_else(|| "rowid".to_string());
            implicit_targets.push((fk.table.clone(), target));
        }

        Ok(normalize_foreign_keys(raw, |parent| {
            implicit_targets
                .iter()
                .find(|(t, _)| t == parent)
                .map_or_else(|| "rowid".to_string(), |(_, c)| c.clone())
        }))
    }
}
