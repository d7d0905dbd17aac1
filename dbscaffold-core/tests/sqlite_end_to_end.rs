//! SQLite end-to-end tests.
//!
//! This test suite covers:
//! - Introspection of a real database file (tables, keys, relationships)
//! - Views and system tables being excluded
//! - Connection lifecycle (missing files, idempotent close)
//! - Full generation into a temporary directory
//!
//! SQLite runs against temporary files, so no containers are needed.

#![cfg(feature = "sqlite")]
#![allow(clippy::unwrap_used)]

use dbscaffold_core::{
    AppConfiguration, ConnectionParams, ConnectionProvider, ConfigSerializer, Dialect, ErrorKind,
    Pipeline, QueryDefinition, RelationshipEdge, Result, introspect::introspect,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;
use tempfile::TempDir;

const SHOP_SCHEMA: &[&str] = &[
    "CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email VARCHAR(255)
    )",
    "CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        total DECIMAL(10,2) DEFAULT 0,
        placed_at DATETIME
    )",
    "CREATE VIEW big_orders AS SELECT * FROM orders WHERE total > 100",
    "INSERT INTO customers (name, email) VALUES ('Ada', 'ada@example.com'), ('Grace', NULL)",
    "INSERT INTO orders (customer_id, total) VALUES (1, 250), (1, 20), (2, 75)",
];

/// Creates a database file populated with `statements`.
async fn create_database(dir: &Path, statements: &[&str]) -> String {
    let path = dir.join("shop.db");
    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true),
    )
    .await
    .unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
    path.to_string_lossy().into_owned()
}

fn shop_config(file: &str) -> AppConfiguration {
    AppConfiguration {
        database_type: "sqlite".into(),
        connection: ConnectionParams::sqlite(file),
        selected_tables: vec!["orders".into()],
        custom_queries: vec![QueryDefinition::new(
            "Top Customers",
            "SELECT c.name, SUM(o.total) AS spent FROM customers c JOIN orders o ON o.customer_id = c.id GROUP BY c.name",
        )],
        ..AppConfiguration::default()
    }
}

// =============================================================================
// Introspection
// =============================================================================

#[tokio::test]
async fn test_introspect_shop() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(dir.path(), SHOP_SCHEMA).await;

    let snapshot = Pipeline::default()
        .analyze("sqlite", &ConnectionParams::sqlite(&file))
        .await?;

    assert_eq!(snapshot.database_type(), Dialect::Sqlite);
    assert_eq!(snapshot.total_tables(), 2);
    let names: Vec<_> = snapshot.tables().keys().cloned().collect();
    assert_eq!(names, vec!["customers", "orders"], "views must be excluded");

    let orders = snapshot.table("orders").unwrap();
    assert_eq!(orders.primary_key.as_deref(), Some("id"));
    let column_names: Vec<_> = orders.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(column_names, vec!["id", "customer_id", "total", "placed_at"]);
    assert!(orders.columns[0].is_primary_key);
    assert!(!orders.columns[1].nullable);
    assert_eq!(orders.columns[2].declared_type, "decimal(10,2)");
    assert_eq!(orders.columns[2].default.as_deref(), Some("0"));
    assert!(orders.indexes.is_empty());

    assert_eq!(
        snapshot.relationships(),
        &[RelationshipEdge {
            from_table: "orders".into(),
            from_column: "customer_id".into(),
            to_table: "customers".into(),
            to_column: "id".into(),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn test_snapshot_serialized_shape() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(dir.path(), SHOP_SCHEMA).await;
    let snapshot = Pipeline::default()
        .analyze("sqlite", &ConnectionParams::sqlite(&file))
        .await?;

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["total_tables"], 2);
    assert_eq!(value["database_type"], "sqlite");
    assert_eq!(value["tables"]["orders"]["primaryKey"], "id");
    assert_eq!(value["tables"]["orders"]["indexes"], serde_json::json!([]));
    assert_eq!(
        value["tables"]["orders"]["foreignKeys"][0]["referenced_table"],
        "customers"
    );
    assert_eq!(value["relationships"][0]["from_column"], "customer_id");
    Ok(())
}

#[tokio::test]
async fn test_implicit_foreign_key_target() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(
        dir.path(),
        &[
            "CREATE TABLE parents (code TEXT PRIMARY KEY)",
            "CREATE TABLE children (id INTEGER PRIMARY KEY, parent TEXT REFERENCES parents)",
        ],
    )
    .await;

    let snapshot = Pipeline::default()
        .analyze("sqlite", &ConnectionParams::sqlite(&file))
        .await?;
    let fk = &snapshot.table("children").unwrap().foreign_keys[0];
    assert_eq!(fk.referenced_table, "parents");
    assert_eq!(fk.referenced_column, "code");
    Ok(())
}

#[tokio::test]
async fn test_composite_key_uses_key_order() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(
        dir.path(),
        &["CREATE TABLE items (tenant TEXT, code TEXT, qty INT, PRIMARY KEY (code, tenant))"],
    )
    .await;

    let snapshot = Pipeline::default()
        .analyze("sqlite", &ConnectionParams::sqlite(&file))
        .await?;
    let items = snapshot.table("items").unwrap();
    assert_eq!(items.primary_key.as_deref(), Some("code"));
    assert!(items.columns[0].is_primary_key);
    assert!(items.columns[1].is_primary_key);
    assert!(!items.columns[2].is_primary_key);
    Ok(())
}

#[tokio::test]
async fn test_empty_database() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(dir.path(), &[]).await;
    let snapshot = Pipeline::default()
        .analyze("sqlite", &ConnectionParams::sqlite(&file))
        .await?;
    assert_eq!(snapshot.total_tables(), 0);
    assert!(snapshot.relationships().is_empty());
    Ok(())
}

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test]
async fn test_missing_file_is_never_created() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.db");

    let err = ConnectionProvider::default()
        .open(Dialect::Sqlite, &ConnectionParams::sqlite(missing.to_string_lossy()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!missing.exists());
}

#[tokio::test]
async fn test_missing_file_parameter() {
    let err = ConnectionProvider::default()
        .open(Dialect::Sqlite, &ConnectionParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("file"));
}

#[tokio::test]
async fn test_closed_connection_rejects_introspection() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(dir.path(), SHOP_SCHEMA).await;

    let mut connection = ConnectionProvider::default()
        .open(Dialect::Sqlite, &ConnectionParams::sqlite(&file))
        .await?;
    connection.close().await;
    connection.close().await;

    assert!(connection.is_closed());
    let err = introspect(&connection).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    Ok(())
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test]
async fn test_generate_application() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let file = create_database(dir.path(), SHOP_SCHEMA).await;
    let output = dir.path().join("generated");

    let report = Pipeline::default()
        .generate_application(&shop_config(&file), &output)
        .await?;

    assert!(report.output_dir.starts_with(&output));
    assert_eq!(report.files_written, 9);
    assert_eq!(report.tables, vec!["orders"]);
    assert_eq!(report.queries.len(), 1);
    assert!(!report.queries[0].is_empty());

    let root = &report.output_dir;
    let index = std::fs::read_to_string(root.join("index.html")).unwrap();
    let orders_at = index.find("Orders").unwrap();
    let query_at = index.find("Top Customers").unwrap();
    assert!(orders_at < query_at, "tables are listed before queries");

    let handler = std::fs::read_to_string(root.join("php/orders.php")).unwrap();
    assert!(handler.contains(r#"private const KEY = '"id"';"#));
    assert!(handler.contains("function delete($key)"));

    let query_file = format!("php/query_{}.php", report.queries[0]);
    let query_handler = std::fs::read_to_string(root.join(query_file)).unwrap();
    assert!(query_handler.contains("GROUP BY c.name"));

    let interchange = std::fs::read_to_string(root.join("config/config.json")).unwrap();
    let restored = ConfigSerializer::deserialize(&interchange)?;
    assert_eq!(restored.selected_tables, vec!["orders"]);
    assert_eq!(
        restored.custom_queries[0].id.as_deref(),
        Some(report.queries[0].as_str())
    );
    assert!(root.join("config/config.php").is_file());
    assert!(root.join("config/Database.php").is_file());
    assert!(root.join("js/app.js").is_file());
    Ok(())
}

#[tokio::test]
async fn test_generate_with_unknown_table_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let file = create_database(dir.path(), SHOP_SCHEMA).await;
    let output = dir.path().join("generated");

    let mut config = shop_config(&file);
    config.selected_tables.push("invoices".into());
    let err = Pipeline::default()
        .generate_application(&config, &output)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_generate_with_unsupported_dialect() {
    let dir = TempDir::new().unwrap();
    let mut config = shop_config("shop.db");
    config.database_type = "oracle".into();

    let err = Pipeline::default()
        .generate_application(&config, dir.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}
