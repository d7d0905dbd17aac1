//! Input configuration of a generation request.

use crate::error::{Result, ScaffoldError};
use crate::models::Dialect;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Title used when the request does not customize one.
pub const DEFAULT_APP_TITLE: &str = "CRUD App";

/// Accent color used when the request does not customize one.
pub const DEFAULT_ACCENT_COLOR: &str = "#fd7e14";

/// Root configuration of one generation request.
///
/// Deserialized from the request payload:
///
/// ```json
/// {
///   "databaseType": "sqlite",
///   "connectionData": { "file": "shop.db" },
///   "selectedTables": ["orders"],
///   "customQueries": [{ "name": "Top Customers", "sql": "SELECT ..." }],
///   "fieldConfigurations": { "orders": { "total": { "label": "Total" } } },
///   "appCustomization": { "title": "Shop", "primaryColor": "#336699" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfiguration {
    /// Raw dialect tag, validated by [`AppConfiguration::dialect`]
    pub database_type: String,
    /// Connection descriptor
    #[serde(rename = "connectionData", default)]
    pub connection: ConnectionParams,
    /// Tables to generate, in navigation order
    #[serde(default)]
    pub selected_tables: Vec<String>,
    /// User-authored queries, in navigation order
    #[serde(default)]
    pub custom_queries: Vec<QueryDefinition>,
    /// Table name to column name to override
    #[serde(default)]
    pub field_configurations: IndexMap<String, IndexMap<String, FieldOverride>>,
    /// Title, accent color and logo
    #[serde(default)]
    pub app_customization: UiCustomization,
}

impl AppConfiguration {
    /// Parses a request payload.
    ///
    /// # Errors
    /// Returns a configuration error when the payload is not valid JSON or
    /// does not have the expected shape.
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| {
            ScaffoldError::configuration(format!("Malformed application configuration: {}", e))
        })
    }

    /// Resolves the dialect tag.
    ///
    /// # Errors
    /// Returns [`ScaffoldError::UnsupportedDialect`] for unknown tags.
    pub fn dialect(&self) -> Result<Dialect> {
        self.database_type.parse()
    }

    /// Overrides configured for one column, if any.
    pub fn field_override(&self, table: &str, column: &str) -> Option<&FieldOverride> {
        self.field_configurations
            .get(table)
            .and_then(|columns| columns.get(column))
    }
}

/// Dialect-dependent connection parameters.
///
/// Which fields are required is decided when the connection is opened.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Database file (SQLite)
    #[serde(alias = "sqlite_file", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Server host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Server port; accepts numbers or numeric strings
    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    /// Database name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// User name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password, never logged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Catalog schema (PostgreSQL), defaults to `public`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("file", &self.file)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("schema", &self.schema)
            .finish()
    }
}

impl ConnectionParams {
    /// Parameters for an embedded file database.
    pub fn sqlite(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// Parameters for a client-server database.
    pub fn server(host: impl Into<String>, port: Option<u16>, database: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            port,
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    /// Host, defaulting to `localhost`.
    pub fn host_or_default(&self) -> &str {
        self.host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or("localhost")
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(port)) => Ok(Some(port)),
        Some(RawPort::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawPort::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
    }
}

/// A user-authored query shown as its own view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Identifier, allocated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// SQL text, executed verbatim by the generated handler
    pub sql: String,
    /// Category tag, carried but not interpreted
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl QueryDefinition {
    /// Creates an anonymous query definition.
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            sql: sql.into(),
            kind: None,
        }
    }

    /// Sets an explicit identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The identifier when present and non-empty.
    pub fn explicit_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Per-column presentation override.
///
/// Keys other than `label`, `widget` and `visible` are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    /// Form and column label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Input widget hint (`text`, `number`, `date`, `textarea`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    /// Whether the field is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Opaque extra keys
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Look and feel of the generated application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiCustomization {
    /// Application title
    #[serde(default = "default_title")]
    pub title: String,
    /// Accent color as `#RGB` or `#RRGGBB`
    #[serde(default = "default_accent_color")]
    pub primary_color: String,
    /// Logo path relative to the generated application root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

fn default_title() -> String {
    DEFAULT_APP_TITLE.to_string()
}

fn default_accent_color() -> String {
    DEFAULT_ACCENT_COLOR.to_string()
}

impl Default for UiCustomization {
    fn default() -> Self {
        Self {
            title: default_title(),
            primary_color: default_accent_color(),
            logo: None,
        }
    }
}
