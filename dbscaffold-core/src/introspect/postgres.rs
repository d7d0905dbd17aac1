//! PostgreSQL catalog access.
//!
//! `information_schema.columns` has no primary key flag, so every call to
//! `describe_columns` also reads `pg_index` and reconciles the result into
//! the column descriptors before returning them.

use super::SchemaCatalog;
use crate::error::{Result, ScaffoldError};
use crate::models::{ColumnDescriptor, Dialect, ForeignKeyDescriptor};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationSchemaColumn {
    /// `column_name`
    pub column_name: String,
    /// `data_type`
    pub data_type: String,
    /// `is_nullable`: `YES` or `NO`
    pub is_nullable: String,
    /// `column_default`
    pub column_default: Option<String>,
}

/// One foreign key row from the constraint views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRow {
    /// Referencing column
    pub column_name: String,
    /// Referenced table
    pub referenced_table: String,
    /// Referenced column
    pub referenced_column: String,
}

/// Maps column rows and the `pg_index` key columns to column descriptors.
///
/// `primary_key_columns` is in key order; every listed column is flagged.
pub fn normalize_columns(
    rows: Vec<InformationSchemaColumn>,
    primary_key_columns: &[String],
) -> Vec<ColumnDescriptor> {
    rows.into_iter()
        .map(|r| {
            let is_primary_key = primary_key_columns.contains(&r.column_name);
            ColumnDescriptor::new(
                r.column_name,
                &r.data_type,
                r.is_nullable.eq_ignore_ascii_case("YES"),
                r.column_default,
                is_primary_key,
            )
        })
        .collect()
}

/// Maps constraint rows to foreign key descriptors.
pub fn normalize_foreign_keys(rows: Vec<ConstraintRow>) -> Vec<ForeignKeyDescriptor> {
    rows.into_iter()
        .map(|r| ForeignKeyDescriptor {
            column: r.column_name,
            referenced_table: r.referenced_table,
            referenced_column: r.referenced_column,
        })
        .collect()
}

fn get<'r, T>(row: &'r PgRow, field: &str, table: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(field)
        .map_err(|e| ScaffoldError::parse_field(field, Some(table), e))
}

/// Catalog strategy for PostgreSQL, scoped to one schema.
pub struct PostgresCatalog<'a> {
    pool: &'a PgPool,
    schema: String,
}

impl<'a> PostgresCatalog<'a> {
    /// Creates a catalog over an open pool for `schema`.
    pub fn new(pool: &'a PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Primary key columns of `table`, in key order.
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT a.attname::text AS column_name
            FROM pg_index i
            JOIN pg_attribute a
              ON a.attrelid = i.indrelid
             AND a.attnum = ANY(i.indkey)
            WHERE i.indrelid = format('%I.%I', $1::text, $2::text)::regclass
              AND i.indisprimary
            ORDER BY array_position(i.indkey::int2[], a.attnum)
        "#;

        sqlx::query_scalar(query)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(
                    format!("Failed to read primary key of '{}.{}'", self.schema, table),
                    e,
                )
            })
    }
}

#[async_trait]
impl SchemaCatalog for PostgresCatalog<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let query = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
        "#;

        sqlx::query_scalar(query)
            .bind(&self.schema)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(
                    format!("Failed to enumerate tables in schema '{}'", self.schema),
                    e,
                )
            })
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let query = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(
                    format!("Failed to read columns of '{}.{}'", self.schema, table),
                    e,
                )
            })?;

        let raw = rows
            .iter()
            .map(|row| {
                Ok(InformationSchemaColumn {
                    column_name: get(row, "column_name", table)?,
                    data_type: get(row, "data_type", table)?,
                    is_nullable: get(row, "is_nullable", table)?,
                    column_default: get(row, "column_default", table)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let primary_key = self.primary_key_columns(table).await?;
        Ok(normalize_columns(raw, &primary_key))
    }

    async fn find_primary_key(&self, table: &str) -> Result<Option<String>> {
        Ok(self.primary_key_columns(table).await?.into_iter().next())
    }

    async fn find_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let query = r#"
            SELECT
                kcu.column_name::text AS column_name,
                ccu.table_name::text AS referenced_table,
                ccu.column_name::text AS referenced_column
            FROM information_schema.table_constraints AS tc
            JOIN information_schema.key_column_usage AS kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage AS ccu
              ON ccu.constraint_name = tc.constraint_name
             AND ccu.constraint_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY tc.constraint_name, kcu.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                ScaffoldError::introspection_failed(
                    format!("Failed to read foreign keys of '{}.{}'", self.schema, table),
                    e,
                )
            })?;

        let raw = rows
            .iter()
            .map(|row| {
                Ok(ConstraintRow {
                    column_name: get(row, "column_name", table)?,
                    referenced_table: get(row, "referenced_table", table)?,
                    referenced_column: get(row, "referenced_column", table)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(normalize_foreign_keys(raw))
    }
}
