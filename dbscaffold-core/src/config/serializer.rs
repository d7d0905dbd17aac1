//! Runtime configuration snapshots.
//!
//! The generated handlers load `config/config.php` and the generated front
//! end reads `config/config.json`. Both carry the same document:
//!
//! ```text
//! database: { type, connection }
//! tables: [...]
//! queries: [...]
//! field_configurations: { table: { column: override } }
//! app: { title, primaryColor, logo }
//! ```

use super::app::{AppConfiguration, ConnectionParams, FieldOverride, QueryDefinition, UiCustomization};
use crate::error::{Result, ScaffoldError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Database section of the runtime document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeDatabase {
    /// Dialect tag
    #[serde(rename = "type")]
    pub database_type: String,
    /// Connection descriptor
    pub connection: ConnectionParams,
}

/// The document loaded by generated handlers at their own runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Connection facts
    pub database: RuntimeDatabase,
    /// Selected tables
    pub tables: Vec<String>,
    /// Query definitions with their identifiers
    pub queries: Vec<QueryDefinition>,
    /// Field overrides
    pub field_configurations: IndexMap<String, IndexMap<String, FieldOverride>>,
    /// UI customization
    pub app: UiCustomization,
}

impl From<&AppConfiguration> for RuntimeConfig {
    fn from(config: &AppConfiguration) -> Self {
        Self {
            database: RuntimeDatabase {
                database_type: config.database_type.clone(),
                connection: config.connection.clone(),
            },
            tables: config.selected_tables.clone(),
            queries: config.custom_queries.clone(),
            field_configurations: config.field_configurations.clone(),
            app: config.app_customization.clone(),
        }
    }
}

impl From<RuntimeConfig> for AppConfiguration {
    fn from(runtime: RuntimeConfig) -> Self {
        Self {
            database_type: runtime.database.database_type,
            connection: runtime.database.connection,
            selected_tables: runtime.tables,
            custom_queries: runtime.queries,
            field_configurations: runtime.field_configurations,
            app_customization: runtime.app,
        }
    }
}

/// Native and interchange renderings of one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedConfig {
    /// PHP source returning the configuration array
    pub native: String,
    /// Pretty-printed JSON
    pub interchange: String,
}

/// Serializes [`AppConfiguration`] for generated code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigSerializer;

impl ConfigSerializer {
    /// Renders both forms of the configuration.
    ///
    /// Either both forms are produced or the call fails.
    ///
    /// # Errors
    /// Returns a serialization error if the document cannot be encoded.
    pub fn serialize(config: &AppConfiguration) -> Result<SerializedConfig> {
        let runtime = RuntimeConfig::from(config);
        let value = serde_json::to_value(&runtime).map_err(|e| ScaffoldError::Serialization {
            context: "Failed to encode runtime configuration".to_string(),
            source: e,
        })?;
        let interchange =
            serde_json::to_string_pretty(&value).map_err(|e| ScaffoldError::Serialization {
                context: "Failed to render config.json".to_string(),
                source: e,
            })?;

        let mut native = String::from("<?php\n\nreturn ");
        native.push_str(&php_export(&value));
        native.push_str(";\n");

        Ok(SerializedConfig {
            native,
            interchange,
        })
    }

    /// Restores a configuration from its interchange form.
    ///
    /// # Errors
    /// Returns a configuration error when the payload is malformed.
    pub fn deserialize(interchange: &str) -> Result<AppConfiguration> {
        let runtime: RuntimeConfig = serde_json::from_str(interchange).map_err(|e| {
            ScaffoldError::configuration(format!("Unparsable runtime configuration: {}", e))
        })?;
        Ok(runtime.into())
    }
}

/// Renders a JSON value as a PHP array literal.
///
/// Objects become associative arrays and lists become indexed arrays.
/// Strings are emitted single-quoted so `$` is never interpolated.
pub fn php_export(value: &Value) -> String {
    let mut out = String::new();
    write_php(&mut out, value, 0);
    out
}

fn write_php(out: &mut String, value: &Value, depth: usize) {
    let indent = "    ".repeat(depth.saturating_add(1));
    let closing = "    ".repeat(depth);
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&php_string(s)),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str("[\n");
            for item in items {
                out.push_str(&indent);
                write_php(out, item, depth.saturating_add(1));
                out.push_str(",\n");
            }
            out.push_str(&closing);
            out.push(']');
        }
        Value::Object(map) if map.is_empty() => out.push_str("[]"),
        Value::Object(map) => {
            out.push_str("[\n");
            for (key, item) in map {
                out.push_str(&indent);
                out.push_str(&php_string(key));
                out.push_str(" => ");
                write_php(out, item, depth.saturating_add(1));
                out.push_str(",\n");
            }
            out.push_str(&closing);
            out.push(']');
        }
    }
}

/// Quotes text as a PHP single-quoted string literal.
pub(crate) fn php_string(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
