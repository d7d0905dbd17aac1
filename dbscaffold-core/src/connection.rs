//! Dialect-specific database connections.
//!
//! [`ConnectionProvider::open`] makes a single connection attempt from
//! [`ConnectionParams`] and hands back a [`Connection`] that owns a
//! one-connection pool. Required parameters per dialect:
//!
//! | Dialect    | Required   | Defaults                                   |
//! |------------|------------|--------------------------------------------|
//! | sqlite     | `file`     | opened read-only, never created            |
//! | mysql      | `database` | host `localhost`, port 3306                |
//! | postgresql | `database` | host `localhost`, port 5432, schema public |
//!
//! # Security
//! Passwords are handed to the driver options directly and never appear in
//! logs or in [`Connection`]'s `Debug` output.

use crate::config::ConnectionParams;
use crate::error::{Result, ScaffoldError};
use crate::models::Dialect;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

#[cfg(feature = "mysql")]
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
#[cfg(feature = "postgresql")]
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

/// Default PostgreSQL catalog schema.
pub const DEFAULT_PG_SCHEMA: &str = "public";

/// Connection behaviour shared by all dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Time allowed for the single connection attempt
    pub connect_timeout: Duration,
    /// Open embedded databases read-only
    pub read_only: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_only: true,
        }
    }
}

impl ConnectionSettings {
    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read-only flag for embedded databases.
    #[must_use]
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Validates connection settings.
    ///
    /// # Errors
    /// Returns a configuration error if the timeout is zero or above ten minutes.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(ScaffoldError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }
        if self.connect_timeout > Duration::from_secs(600) {
            return Err(ScaffoldError::configuration(
                "connect_timeout should not exceed 600 seconds",
            ));
        }
        Ok(())
    }
}

/// Dialect-specific pool backing a [`Connection`].
#[derive(Debug, Clone)]
pub enum DatabasePool {
    /// SQLite pool
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
    /// MySQL pool
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    /// PostgreSQL pool
    #[cfg(feature = "postgresql")]
    Postgres(PgPool),
}

impl DatabasePool {
    async fn close(self) {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => pool.close().await,
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => pool.close().await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(pool) => pool.close().await,
        }
    }
}

/// An open database connection owned by one operation.
pub struct Connection {
    dialect: Dialect,
    pool: Option<DatabasePool>,
    schema: String,
    target: String,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("dialect", &self.dialect)
            .field("target", &self.target)
            .field("closed", &self.pool.is_none())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wraps an existing pool.
    pub fn from_pool(dialect: Dialect, pool: DatabasePool, target: impl Into<String>) -> Self {
        Self {
            dialect,
            pool: Some(pool),
            schema: DEFAULT_PG_SCHEMA.to_string(),
            target: target.into(),
        }
    }

    /// Sets the catalog schema (PostgreSQL).
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Dialect of this connection.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Catalog schema used for PostgreSQL introspection.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Credential-free description of the target, for logs.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether [`Connection::close`] has been called.
    pub const fn is_closed(&self) -> bool {
        self.pool.is_none()
    }

    /// Returns the pool, failing once the connection is closed.
    ///
    /// # Errors
    /// Returns a connection error after [`Connection::close`].
    pub fn pool(&self) -> Result<&DatabasePool> {
        self.pool.as_ref().ok_or_else(|| ScaffoldError::Connection {
            context: format!("connection to {} is closed", self.target),
            source: None,
        })
    }

    /// Releases the connection. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            tracing::debug!("Closing connection to {}", self.target);
            pool.close().await;
        }
    }

    /// Runs `SELECT 1` against the database.
    ///
    /// # Errors
    /// Returns a connection error if the round trip fails.
    pub async fn ping(&self) -> Result<()> {
        match self.pool()? {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map(|_| ()),
            #[cfg(feature = "mysql")]
            DatabasePool::MySql(pool) => sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map(|_| ()),
            #[cfg(feature = "postgresql")]
            DatabasePool::Postgres(pool) => sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .map_err(|e| ScaffoldError::connection_failed(format!("ping {} failed", self.target), e))
    }

    /// Runs a query verbatim and returns each row as a JSON object.
    ///
    /// Column values are decoded as text, integer, float, boolean or
    /// date/time, in that order. Decimals are passed through as their text
    /// form; anything else becomes `null`.
    ///
    /// # Errors
    /// Returns an introspection-class error if the statement fails.
    pub async fn fetch_rows(&self, sql: &str) -> Result<Vec<Map<String, Value>>> {
        let context = || format!("query against {} failed", self.target);
        match self.pool()? {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| ScaffoldError::introspection_failed(context(), e))?;
                Ok(rows.iter().map(sqlite_row_to_json).collect())
            }
            #[cfg(feature = "mysql")]
            DatabasePool::MySql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| ScaffoldError::introspection_failed(context(), e))?;
                Ok(rows.iter().map(mysql_row_to_json).collect())
            }
            #[cfg(feature = "postgresql")]
            DatabasePool::Postgres(pool) => {
                // Postgres decoding is strict about widths, so let the server
                // build the JSON objects.
                let wrapped = format!(
                    "SELECT row_to_json(t.*) AS row_data FROM ({}) t",
                    sql.trim().trim_end_matches(';')
                );
                let rows: Vec<Value> = sqlx::query_scalar(&wrapped)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| ScaffoldError::introspection_failed(context(), e))?;
                Ok(rows
                    .into_iter()
                    .filter_map(|row| match row {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect())
            }
        }
    }

    /// Executes a statement verbatim and returns the affected row count.
    ///
    /// # Errors
    /// Returns an introspection-class error if the statement fails.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let context = || format!("statement against {} failed", self.target);
        match self.pool()? {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            #[cfg(feature = "mysql")]
            DatabasePool::MySql(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            #[cfg(feature = "postgresql")]
            DatabasePool::Postgres(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .map_err(|e| ScaffoldError::introspection_failed(context(), e))
    }
}

macro_rules! row_to_json {
    ($name:ident, $row:ty $(, $unsigned:ty)*) => {
        fn $name(row: &$row) -> Map<String, Value> {
            use sqlx::{Column, Row};

            let mut map = Map::new();
            for column in row.columns() {
                let name = column.name();
                let value = if let Ok(v) = row.try_get::<Option<String>, _>(name) {
                    v.map_or(Value::Null, Value::String)
                } else if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
                    v.map_or(Value::Null, |n| Value::Number(n.into()))
                } $(else if let Ok(v) = row.try_get::<Option<$unsigned>, _>(name) {
                    v.map_or(Value::Null, |n| Value::Number(n.into()))
                })* else if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
                    v.and_then(serde_json::Number::from_f64)
                        .map_or(Value::Null, Value::Number)
                } else if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
                    v.map_or(Value::Null, Value::Bool)
                } else if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
                    v.map_or(Value::Null, |t| Value::String(t.to_string()))
                } else if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
                    v.map_or(Value::Null, |t| Value::String(t.to_rfc3339()))
                } else if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
                    v.map_or(Value::Null, |d| Value::String(d.to_string()))
                } else if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(name) {
                    v.map_or(Value::Null, |t| Value::String(t.to_string()))
                } else if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(name) {
                    // DECIMAL travels as text on the wire.
                    v.map_or(Value::Null, Value::String)
                } else {
                    Value::Null
                };
                map.insert(name.to_string(), value);
            }
            map
        }
    };
}

#[cfg(feature = "sqlite")]
row_to_json!(sqlite_row_to_json, SqliteRow);
#[cfg(feature = "mysql")]
row_to_json!(mysql_row_to_json, MySqlRow, u64);

/// Opens connections for any supported dialect.
#[derive(Debug, Clone, Default)]
pub struct ConnectionProvider {
    settings: ConnectionSettings,
}

impl ConnectionProvider {
    /// Creates a provider with custom settings.
    pub const fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    /// Opens a connection from a raw dialect tag.
    ///
    /// The tag is resolved before any I/O happens.
    ///
    /// # Errors
    /// Returns [`ScaffoldError::UnsupportedDialect`] for unknown tags, and
    /// the errors of [`ConnectionProvider::open`] otherwise.
    pub async fn open_tagged(&self, tag: &str, params: &ConnectionParams) -> Result<Connection> {
        let dialect: Dialect = tag.parse()?;
        self.open(dialect, params).await
    }

    /// Opens a connection. Single attempt, no retry.
    ///
    /// # Errors
    /// Returns a connection error when required parameters are missing, the
    /// dialect's driver was not compiled in, or the driver fails to connect.
    pub async fn open(&self, dialect: Dialect, params: &ConnectionParams) -> Result<Connection> {
        self.settings.validate()?;
        tracing::debug!("Opening {} connection", dialect.display_name());

        match dialect {
            Dialect::Sqlite => self.open_sqlite(params).await,
            Dialect::MySql => self.open_mysql(params).await,
            Dialect::Postgres => self.open_postgres(params).await,
        }
    }

    #[cfg(feature = "sqlite")]
    async fn open_sqlite(&self, params: &ConnectionParams) -> Result<Connection> {
        let file = params
            .file
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| ScaffoldError::missing_parameter("file", "sqlite"))?;

        // Never create a database as a side effect of introspection.
        tokio::fs::metadata(file).await.map_err(|e| {
            ScaffoldError::connection_failed(format!("SQLite database file '{}' not found", file), e)
        })?;

        let options = SqliteConnectOptions::new()
            .filename(file)
            .create_if_missing(false)
            .read_only(self.settings.read_only);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.settings.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                ScaffoldError::connection_failed(format!("failed to open SQLite file '{}'", file), e)
            })?;

        tracing::info!("Connected to SQLite database {}", file);
        Ok(Connection::from_pool(
            Dialect::Sqlite,
            DatabasePool::Sqlite(pool),
            format!("sqlite:{}", file),
        ))
    }

    #[cfg(not(feature = "sqlite"))]
    async fn open_sqlite(&self, _params: &ConnectionParams) -> Result<Connection> {
        Err(not_compiled(Dialect::Sqlite))
    }

    #[cfg(feature = "mysql")]
    async fn open_mysql(&self, params: &ConnectionParams) -> Result<Connection> {
        let (host, port, database) = server_target(Dialect::MySql, params)?;

        let mut options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .database(database)
            .charset("utf8mb4");
        if let Some(username) = params.username.as_deref() {
            options = options.username(username);
        }
        if let Some(password) = params.password.as_deref() {
            options = options.password(password);
        }

        let target = format!("mysql://{}:{}/{}", host, port, database);
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.settings.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| ScaffoldError::connection_failed(format!("failed to connect to {}", target), e))?;

        tracing::info!("Connected to {}", target);
        Ok(Connection::from_pool(Dialect::MySql, DatabasePool::MySql(pool), target))
    }

    #[cfg(not(feature = "mysql"))]
    async fn open_mysql(&self, _params: &ConnectionParams) -> Result<Connection> {
        Err(not_compiled(Dialect::MySql))
    }

    #[cfg(feature = "postgresql")]
    async fn open_postgres(&self, params: &ConnectionParams) -> Result<Connection> {
        let (host, port, database) = server_target(Dialect::Postgres, params)?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);
        if let Some(username) = params.username.as_deref() {
            options = options.username(username);
        }
        if let Some(password) = params.password.as_deref() {
            options = options.password(password);
        }

        let target = format!("postgresql://{}:{}/{}", host, port, database);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.settings.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| ScaffoldError::connection_failed(format!("failed to connect to {}", target), e))?;

        let schema = params
            .schema
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_PG_SCHEMA);

        tracing::info!("Connected to {} (schema {})", target, schema);
        Ok(
            Connection::from_pool(Dialect::Postgres, DatabasePool::Postgres(pool), target)
                .with_schema(schema),
        )
    }

    #[cfg(not(feature = "postgresql"))]
    async fn open_postgres(&self, _params: &ConnectionParams) -> Result<Connection> {
        Err(not_compiled(Dialect::Postgres))
    }
}

/// Resolves host, port and database for client-server dialects.
fn server_target(dialect: Dialect, params: &ConnectionParams) -> Result<(&str, u16, &str)> {
    let database = params
        .database
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ScaffoldError::missing_parameter("database", dialect.as_str()))?;
    let port = params
        .port
        .or_else(|| dialect.default_port())
        .filter(|p| *p > 0)
        .ok_or_else(|| ScaffoldError::Connection {
            context: "port must be greater than 0".to_string(),
            source: None,
        })?;
    Ok((params.host_or_default(), port, database))
}

#[allow(dead_code)]
fn not_compiled(dialect: Dialect) -> ScaffoldError {
    ScaffoldError::Connection {
        context: format!(
            "{} support not compiled in. Rebuild with --features {}",
            dialect.display_name(),
            dialect.as_str()
        ),
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_settings_validation() {
        assert!(ConnectionSettings::default().validate().is_ok());
        assert!(
            ConnectionSettings::default()
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            ConnectionSettings::default()
                .with_connect_timeout(Duration::from_secs(3600))
                .validate()
                .is_err()
        );
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_from_pool_schema() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let mut connection =
            Connection::from_pool(Dialect::Sqlite, DatabasePool::Sqlite(pool), "sqlite::memory:");
        assert_eq!(connection.schema(), DEFAULT_PG_SCHEMA);
        assert_eq!(connection.target(), "sqlite::memory:");

        connection = connection.with_schema("archive");
        assert_eq!(connection.schema(), "archive");
        assert!(connection.ping().await.is_ok());
        connection.close().await;
        assert!(connection.is_closed());
    }

    #[test]
    fn test_server_target_defaults() {
        let params = ConnectionParams {
            database: Some("shop".into()),
            ..ConnectionParams::default()
        };
        assert_eq!(
            server_target(Dialect::MySql, &params).unwrap(),
            ("localhost", 3306, "shop")
        );
        assert_eq!(
            server_target(Dialect::Postgres, &params).unwrap(),
            ("localhost", 5432, "shop")
        );

        let params = ConnectionParams::server("db.internal", Some(6000), "shop");
        assert_eq!(
            server_target(Dialect::Postgres, &params).unwrap(),
            ("db.internal", 6000, "shop")
        );
    }

    #[test]
    fn test_server_target_requires_database() {
        let err = server_target(Dialect::MySql, &ConnectionParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("'database' is required"));

        let params = ConnectionParams::server("localhost", Some(0), "shop");
        assert!(server_target(Dialect::MySql, &params).is_err());
    }

    #[tokio::test]
    async fn test_unknown_tag_fails_before_io() {
        let provider = ConnectionProvider::default();
        let err = provider
            .open_tagged("oracle", &ConnectionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::UnsupportedDialect { .. }));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_requires_file() {
        let provider = ConnectionProvider::default();
        let err = provider
            .open(Dialect::Sqlite, &ConnectionParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'file' is required"));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_missing_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let provider = ConnectionProvider::default();

        let err = provider
            .open(
                Dialect::Sqlite,
                &ConnectionParams::sqlite(path.to_string_lossy()),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(!path.exists());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let setup = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, price REAL)")
            .execute(&setup)
            .await
            .unwrap();
        sqlx::query("INSERT INTO items (label, price) VALUES ('pen', 1.5), (NULL, 2.0)")
            .execute(&setup)
            .await
            .unwrap();
        setup.close().await;

        let provider = ConnectionProvider::default();
        let mut conn = provider
            .open(Dialect::Sqlite, &ConnectionParams::sqlite(path.to_string_lossy()))
            .await
            .unwrap();
        conn.ping().await.unwrap();

        let rows = conn
            .fetch_rows("SELECT id, label, price FROM items ORDER BY id")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["label"], "pen");
        assert_eq!(rows[0]["price"], 1.5);
        assert_eq!(rows[1]["label"], Value::Null);

        conn.close().await;
        assert!(conn.is_closed());
        conn.close().await;
        assert!(conn.is_closed());
        assert!(conn.ping().await.is_err());
    }
}
