//! CRUD application generation.
//!
//! [`ArtifactGenerator::generate`] turns one [`AppConfiguration`] and the
//! [`SchemaSnapshot`] it was validated against into a
//! [`GeneratedArtifactSet`]. Rendering is pure: nothing touches the
//! filesystem until the set is handed to an [`ArtifactWriter`].
//!
//! # Output layout
//!
//! ```text
//! index.html
//! js/app.js
//! config/Database.php
//! config/config.php
//! config/config.json
//! php/<table>.php            templates/<table>.html
//! php/query_<id>.php         templates/query_<id>.html
//! ```

pub mod color;
mod templates;
mod writer;

pub use templates::{html_escape, js_string, url_segment};
pub use writer::{ArtifactWriter, WrittenApplication};

use crate::config::{AppConfiguration, ConfigSerializer, FieldOverride, QueryDefinition, php_string};
use crate::error::{Result, ScaffoldError};
use crate::identifiers::{IdentifierAllocator, code_ident, ensure_safe_file_name};
use crate::models::{ColumnDescriptor, Dialect, SchemaSnapshot, TableDescriptor};
use askama::Template;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use templates::{
    FormField, HandlerColumn, IndexTemplate, ListColumn, QueryHandlerTemplate, QueryViewTemplate,
    SidebarEntry, TableHandlerTemplate, TableViewTemplate,
};

/// Sidebar text shown when nothing was selected.
pub const EMPTY_NAVIGATION_LABEL: &str = "No entries to display";

/// Label of queries without a display name.
pub const DEFAULT_QUERY_LABEL: &str = "Custom Query";

const APP_SCRIPT: &str = include_str!("../../assets/app.js");
const RUNTIME_SUPPORT: &str = include_str!("../../assets/Database.php");

/// Widget hints accepted verbatim as `<input type>` values.
const INPUT_WIDGETS: &[&str] = &[
    "text",
    "number",
    "date",
    "datetime-local",
    "time",
    "email",
    "password",
    "tel",
    "url",
    "color",
];

/// One generated file, addressed relative to the application root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Relative path with `/` separators
    pub path: String,
    /// File contents
    pub contents: String,
}

impl Artifact {
    fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// What a navigation entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A selected table with full CRUD
    Table,
    /// A read-only custom query
    Query,
}

impl EntityKind {
    const fn icon(self) -> &'static str {
        match self {
            Self::Table => "bi-table",
            Self::Query => "bi-search",
        }
    }
}

/// One sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    /// `table-<name>` or `query-<id>`
    pub view_id: String,
    /// Display label
    pub label: String,
    /// Entity type
    pub kind: EntityKind,
}

/// The navigation the entry point was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "entries", rename_all = "snake_case")]
pub enum NavigationModel {
    /// Tables first, then queries
    Entries(Vec<NavEntry>),
    /// Nothing selected; the entry point shows [`EMPTY_NAVIGATION_LABEL`]
    Empty,
}

impl NavigationModel {
    fn from_entries(entries: Vec<NavEntry>) -> Self {
        if entries.is_empty() {
            Self::Empty
        } else {
            Self::Entries(entries)
        }
    }

    /// Entries in display order; empty for the placeholder state.
    pub fn entries(&self) -> &[NavEntry] {
        match self {
            Self::Entries(entries) => entries,
            Self::Empty => &[],
        }
    }

    /// Whether only the placeholder is shown.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Handler and view of one table or query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEntity {
    /// Entity type
    pub kind: EntityKind,
    /// Table name or query id
    pub name: String,
    /// Identifier used in generated class and function names
    pub code_ident: String,
    /// Navigation identifier
    pub view_id: String,
    /// Display label
    pub label: String,
    /// PHP controller
    pub handler: Artifact,
    /// HTML fragment with its client bindings
    pub view: Artifact,
}

/// Everything one generation run produces.
#[derive(Debug, Clone)]
pub struct GeneratedArtifactSet {
    /// `index.html`
    pub entry_point: Artifact,
    /// `js/app.js`
    pub app_script: Artifact,
    /// `config/Database.php`
    pub runtime_support: Artifact,
    /// `config/config.php`
    pub config_native: Artifact,
    /// `config/config.json`
    pub config_interchange: Artifact,
    /// Tables first, then queries, in navigation order
    pub entities: Vec<GeneratedEntity>,
    /// Navigation the entry point was rendered from
    pub navigation: NavigationModel,
    /// The configuration as serialized, with every query id allocated
    pub configuration: AppConfiguration,
}

impl GeneratedArtifactSet {
    /// Iterates over every file of the application.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        [
            &self.entry_point,
            &self.app_script,
            &self.runtime_support,
            &self.config_native,
            &self.config_interchange,
        ]
        .into_iter()
        .chain(self.entities.iter().flat_map(|e| [&e.handler, &e.view]))
    }

    /// Number of files in the set.
    pub fn len(&self) -> usize {
        self.entities.len().saturating_mul(2).saturating_add(5)
    }

    /// Never true: the shell artifacts are always present.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Looks up an entity by navigation identifier.
    pub fn entity(&self, view_id: &str) -> Option<&GeneratedEntity> {
        self.entities.iter().find(|e| e.view_id == view_id)
    }

    /// Looks up an artifact by relative path.
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts().find(|a| a.path == path)
    }
}

/// Renders CRUD applications.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactGenerator;

impl ArtifactGenerator {
    /// Renders the application for `config` over `snapshot`.
    ///
    /// # Errors
    /// - generation error for an unknown dialect tag, unsafe file names,
    ///   colliding identifiers or paths, and template failures
    /// - configuration error for tables missing from the snapshot, a
    ///   dialect that differs from the snapshot's, invalid query ids and
    ///   invalid colors
    pub fn generate(
        config: &AppConfiguration,
        snapshot: &SchemaSnapshot,
    ) -> Result<GeneratedArtifactSet> {
        let dialect = config.dialect().map_err(|_| {
            ScaffoldError::generation(format!(
                "Cannot generate for unsupported database type '{}'",
                config.database_type
            ))
        })?;
        if dialect != snapshot.database_type() {
            return Err(ScaffoldError::configuration(format!(
                "Configuration targets {} but the schema was read from {}",
                dialect.display_name(),
                snapshot.database_type().display_name()
            )));
        }

        tracing::info!(
            "Generating application: {} tables, {} queries",
            config.selected_tables.len(),
            config.custom_queries.len()
        );

        let queries = IdentifierAllocator::allocate_all(&config.custom_queries)?;
        let mut guard = CollisionGuard::default();
        let mut entities = Vec::with_capacity(config.selected_tables.len() + queries.len());

        for name in &config.selected_tables {
            ensure_safe_file_name(name)?;
            let table = snapshot.table(name).ok_or_else(|| {
                ScaffoldError::configuration(format!(
                    "Selected table '{}' does not exist in the {} schema",
                    name,
                    dialect.display_name()
                ))
            })?;
            let entity = render_table(dialect, table, config)?;
            guard.claim(&entity)?;
            tracing::debug!("Rendered table '{}' as {}", name, entity.code_ident);
            entities.push(entity);
        }

        for query in &queries {
            let entity = render_query(query)?;
            guard.claim(&entity)?;
            tracing::debug!("Rendered query '{}' as {}", entity.name, entity.code_ident);
            entities.push(entity);
        }

        let navigation = NavigationModel::from_entries(
            entities
                .iter()
                .map(|e| NavEntry {
                    view_id: e.view_id.clone(),
                    label: e.label.clone(),
                    kind: e.kind,
                })
                .collect(),
        );

        let entry_point = Artifact::new("index.html", render_index(config, &navigation)?);

        let mut configuration = config.clone();
        configuration.database_type = dialect.as_str().to_string();
        configuration.custom_queries = queries;
        let serialized = ConfigSerializer::serialize(&configuration)?;

        tracing::info!("✓ Rendered {} entities", entities.len());
        Ok(GeneratedArtifactSet {
            entry_point,
            app_script: Artifact::new("js/app.js", APP_SCRIPT),
            runtime_support: Artifact::new("config/Database.php", RUNTIME_SUPPORT),
            config_native: Artifact::new("config/config.php", serialized.native),
            config_interchange: Artifact::new("config/config.json", serialized.interchange),
            entities,
            navigation,
            configuration,
        })
    }
}

/// Tracks names that must stay unique across one run.
#[derive(Default)]
struct CollisionGuard {
    paths: HashSet<String>,
    idents: HashMap<(EntityKind, String), String>,
}

impl CollisionGuard {
    fn claim(&mut self, entity: &GeneratedEntity) -> Result<()> {
        let key = (entity.kind, entity.code_ident.clone());
        if let Some(previous) = self.idents.get(&key) {
            return Err(ScaffoldError::generation(format!(
                "'{}' and '{}' both map to the code identifier '{}'",
                previous, entity.name, entity.code_ident
            )));
        }
        for path in [&entity.handler.path, &entity.view.path] {
            if !self.paths.insert(path.clone()) {
                return Err(ScaffoldError::generation(format!(
                    "'{}' would overwrite the generated file '{}'",
                    entity.name, path
                )));
            }
        }
        self.idents.insert(key, entity.name.clone());
        Ok(())
    }
}

/// `order_items` becomes `Order Items`.
pub fn table_label(name: &str) -> String {
    name.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Input type inferred from a normalized declared type.
fn inferred_input(declared_type: &str) -> (&'static str, bool) {
    let base = declared_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches(" unsigned");
    match base {
        "text" | "mediumtext" | "longtext" => ("text", true),
        "date" => ("date", false),
        "datetime" => ("datetime-local", false),
        b if b.starts_with("timestamp") => ("datetime-local", false),
        "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "decimal"
        | "numeric" | "float" | "double" | "double precision" | "real" | "serial"
        | "bigserial" | "smallserial" => ("number", false),
        _ => ("text", false),
    }
}

fn form_field(column: &ColumnDescriptor, field: Option<&FieldOverride>) -> FormField {
    let (mut input_type, mut multiline) = inferred_input(&column.declared_type);
    if let Some(widget) = field.and_then(|f| f.widget.as_deref()) {
        if widget == "textarea" {
            multiline = true;
        } else if let Some(known) = INPUT_WIDGETS.iter().find(|w| **w == widget) {
            input_type = *known;
            multiline = false;
        } else {
            tracing::warn!(
                "Unknown widget '{}' for column '{}', using '{}'",
                widget,
                column.name,
                input_type
            );
        }
    }

    let label = field
        .and_then(|f| f.label.as_deref())
        .unwrap_or(&column.name);
    FormField {
        name: html_escape(&column.name),
        label: html_escape(label),
        input_type,
        multiline,
        required: !column.nullable && column.default.is_none() && !column.is_primary_key,
    }
}

fn render<T: Template>(template: &T, path: &str) -> Result<String> {
    template
        .render()
        .map_err(|e| ScaffoldError::template(format!("Failed to render '{}'", path), e))
}

fn render_table(
    dialect: Dialect,
    table: &TableDescriptor,
    config: &AppConfiguration,
) -> Result<GeneratedEntity> {
    let ident = code_ident(&table.name);
    let key = table.identity_column();
    if table.primary_key.is_none() {
        tracing::warn!(
            "Table '{}' has no primary key; rows are addressed by 'id'",
            table.name
        );
    }

    let handler_path = format!("php/{}.php", table.name);
    let handler = TableHandlerTemplate {
        class_name: format!("{}Controller", ident),
        table_sql: php_string(&dialect.quote_identifier(&table.name)),
        key_sql: php_string(&dialect.quote_identifier(key)),
        key_name: php_string(key),
        columns: table
            .columns
            .iter()
            .map(|c| HandlerColumn {
                name: php_string(&c.name),
                sql: php_string(&dialect.quote_identifier(&c.name)),
            })
            .collect(),
    };

    let visible: Vec<(&ColumnDescriptor, Option<&FieldOverride>)> = table
        .columns
        .iter()
        .map(|c| (c, config.field_override(&table.name, &c.name)))
        .filter(|(_, f)| f.and_then(|f| f.visible).unwrap_or(true))
        .collect();

    let label = table_label(&table.name);
    let view_path = format!("templates/{}.html", table.name);
    let view = TableViewTemplate {
        ident: ident.clone(),
        label: html_escape(&label),
        handler_url: js_string(&format!("php/{}.php", url_segment(&table.name))),
        key_js: js_string(key),
        columns: visible
            .iter()
            .map(|(c, f)| ListColumn {
                label: html_escape(f.and_then(|f| f.label.as_deref()).unwrap_or(&c.name)),
                key_js: js_string(&c.name),
            })
            .collect(),
        fields: visible.iter().map(|(c, f)| form_field(c, *f)).collect(),
    };

    Ok(GeneratedEntity {
        kind: EntityKind::Table,
        name: table.name.clone(),
        code_ident: ident,
        view_id: format!("table-{}", table.name),
        label,
        handler: Artifact::new(&handler_path, render(&handler, &handler_path)?),
        view: Artifact::new(&view_path, render(&view, &view_path)?),
    })
}

fn render_query(query: &QueryDefinition) -> Result<GeneratedEntity> {
    let id = query
        .explicit_id()
        .ok_or_else(|| ScaffoldError::generation("Query reached rendering without an id"))?;
    let ident = code_ident(id);
    let label = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_QUERY_LABEL)
        .to_string();

    // Executed verbatim: custom queries are trusted configuration.
    let handler_path = format!("php/query_{}.php", id);
    let handler = QueryHandlerTemplate {
        class_name: format!("Query{}Controller", ident),
        sql: php_string(&query.sql),
    };

    let view_path = format!("templates/query_{}.html", id);
    let view = QueryViewTemplate {
        ident: ident.clone(),
        label: html_escape(&label),
        handler_url: js_string(&format!("php/query_{}.php", url_segment(id))),
    };

    Ok(GeneratedEntity {
        kind: EntityKind::Query,
        name: id.to_string(),
        code_ident: ident,
        view_id: format!("query-{}", id),
        label,
        handler: Artifact::new(&handler_path, render(&handler, &handler_path)?),
        view: Artifact::new(&view_path, render(&view, &view_path)?),
    })
}

fn render_index(config: &AppConfiguration, navigation: &NavigationModel) -> Result<String> {
    let ui = &config.app_customization;
    let primary_color = color::normalize(&ui.primary_color)?;
    let primary_color_dark = color::darken(&primary_color, color::HOVER_DARKEN_PERCENT)?;
    let title = if ui.title.trim().is_empty() {
        crate::config::DEFAULT_APP_TITLE.to_string()
    } else {
        ui.title.clone()
    };

    let page = IndexTemplate {
        title,
        primary_color,
        primary_color_dark,
        logo: ui.logo.clone().filter(|l| !l.trim().is_empty()),
        entries: navigation
            .entries()
            .iter()
            .map(|e| SidebarEntry {
                view_id: e.view_id.clone(),
                label: e.label.clone(),
                icon: e.kind.icon(),
            })
            .collect(),
        placeholder: navigation
            .is_empty()
            .then(|| EMPTY_NAVIGATION_LABEL.to_string()),
    };
    render(&page, "index.html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionParams;
    use crate::error::ErrorKind;
    use crate::models::ForeignKeyDescriptor;

    fn column(name: &str, ty: &str, nullable: bool, pk: bool) -> ColumnDescriptor {
        ColumnDescriptor::new(name, ty, nullable, None, pk)
    }

    fn shop() -> SchemaSnapshot {
        SchemaSnapshot::new(
            Dialect::Sqlite,
            vec![
                TableDescriptor::new(
                    "customers",
                    vec![
                        column("id", "INTEGER", false, true),
                        column("name", "TEXT", false, false),
                    ],
                    Some("id".into()),
                    Vec::new(),
                ),
                TableDescriptor::new(
                    "order_items",
                    vec![
                        column("id", "INTEGER", false, true),
                        column("customer_id", "INTEGER", true, false),
                        column("placed_at", "DATETIME", true, false),
                        column("note", "TEXT", true, false),
                    ],
                    Some("id".into()),
                    vec![ForeignKeyDescriptor {
                        column: "customer_id".into(),
                        referenced_table: "customers".into(),
                        referenced_column: "id".into(),
                    }],
                ),
                TableDescriptor::new(
                    "log",
                    vec![column("message", "TEXT", true, false)],
                    None,
                    Vec::new(),
                ),
            ],
        )
    }

    fn config(tables: &[&str], queries: Vec<QueryDefinition>) -> AppConfiguration {
        AppConfiguration {
            database_type: "sqlite".into(),
            connection: ConnectionParams::sqlite("shop.db"),
            selected_tables: tables.iter().map(|t| t.to_string()).collect(),
            custom_queries: queries,
            ..AppConfiguration::default()
        }
    }

    #[test]
    fn test_table_label() {
        assert_eq!(table_label("order_items"), "Order Items");
        assert_eq!(table_label("orders"), "Orders");
        assert_eq!(table_label("already Spaced"), "Already Spaced");
    }

    #[test]
    fn test_inferred_input() {
        assert_eq!(inferred_input("integer"), ("number", false));
        assert_eq!(inferred_input("int(11) unsigned"), ("number", false));
        assert_eq!(inferred_input("decimal(10,2)"), ("number", false));
        assert_eq!(inferred_input("date"), ("date", false));
        assert_eq!(inferred_input("timestamp without time zone"), ("datetime-local", false));
        assert_eq!(inferred_input("text"), ("text", true));
        assert_eq!(inferred_input("varchar(255)"), ("text", false));
    }

    #[test]
    fn test_navigation_order_and_labels() {
        let set = ArtifactGenerator::generate(
            &config(
                &["order_items", "customers"],
                vec![QueryDefinition::new("Top Customers", "SELECT * FROM customers")],
            ),
            &shop(),
        )
        .unwrap();

        let labels: Vec<_> = set.navigation.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Order Items", "Customers", "Top Customers"]);
        assert_eq!(set.navigation.entries()[2].view_id, "query-top_customers");
        assert_eq!(set.len(), 11);
        assert_eq!(set.artifacts().count(), set.len());
    }

    #[test]
    fn test_table_artifacts() {
        let set = ArtifactGenerator::generate(&config(&["order_items"], Vec::new()), &shop()).unwrap();
        let entity = set.entity("table-order_items").unwrap();

        assert_eq!(entity.handler.path, "php/order_items.php");
        assert_eq!(entity.view.path, "templates/order_items.html");
        assert!(entity.handler.contents.contains("class OrderItemsController"));
        assert!(entity.handler.contents.contains(r#"private const TABLE = '"order_items"';"#));
        assert!(entity.handler.contents.contains(r#"'customer_id' => '"customer_id"',"#));
        assert!(entity.handler.contents.contains("new Database($config['database'])"));

        let view = &entity.view.contents;
        for binding in [
            "function loadOrderItemsTable()",
            "function showCreateOrderItemsModal()",
            "function editOrderItems(key)",
            "function deleteOrderItems(key)",
            "function saveOrderItems()",
        ] {
            assert!(view.contains(binding), "missing {}", binding);
        }
        assert!(view.contains("url: 'php/order_items.php'"));
        assert!(view.contains(r#"type="datetime-local""#));
        assert!(
            view.contains("value.replace(' ', 'T')"),
            "stored datetimes must be converted for datetime-local inputs"
        );
        assert!(view.contains("<textarea"));
        assert!(view.contains("confirm("));
    }

    #[test]
    fn test_missing_primary_key_falls_back_to_id() {
        let set = ArtifactGenerator::generate(&config(&["log"], Vec::new()), &shop()).unwrap();
        let handler = &set.entity("table-log").unwrap().handler.contents;
        assert!(handler.contains(r#"private const KEY = '"id"';"#));
    }

    #[test]
    fn test_field_overrides() {
        let mut cfg = config(&["customers"], Vec::new());
        cfg.field_configurations.insert(
            "customers".into(),
            [
                (
                    "name".to_string(),
                    FieldOverride {
                        label: Some("Full <name>".into()),
                        widget: Some("email".into()),
                        ..FieldOverride::default()
                    },
                ),
                (
                    "id".to_string(),
                    FieldOverride {
                        visible: Some(false),
                        ..FieldOverride::default()
                    },
                ),
            ]
            .into_iter()
            .collect(),
        );

        let set = ArtifactGenerator::generate(&cfg, &shop()).unwrap();
        let view = &set.entity("table-customers").unwrap().view.contents;
        assert!(view.contains("Full &lt;name&gt;"));
        assert!(view.contains(r#"type="email""#));
        assert!(!view.contains("{ data: 'id'"));
        assert!(view.contains("{ data: 'name'"));
    }

    #[test]
    fn test_query_artifacts() {
        let sql = "SELECT name, 'it''s' AS quote FROM customers";
        let set = ArtifactGenerator::generate(
            &config(&[], vec![QueryDefinition::new("", sql).with_id("best-buyers")]),
            &shop(),
        )
        .unwrap();
        let entity = set.entity("query-best-buyers").unwrap();

        assert_eq!(entity.label, DEFAULT_QUERY_LABEL);
        assert_eq!(entity.handler.path, "php/query_best-buyers.php");
        assert!(entity.handler.contents.contains("class QueryBestBuyersController"));
        assert!(entity.handler.contents.contains(&php_string(sql)));
        assert!(!entity.handler.contents.contains("'create'"));
        assert!(entity.view.contents.contains("<th>#</th>"));
        assert!(entity.view.contents.contains("meta.row + 1"));
    }

    #[test]
    fn test_empty_selection_placeholder() {
        let set = ArtifactGenerator::generate(&config(&[], Vec::new()), &shop()).unwrap();
        assert!(set.navigation.is_empty());
        assert!(set.entities.is_empty());
        assert!(set.entry_point.contents.contains(EMPTY_NAVIGATION_LABEL));
    }

    #[test]
    fn test_entry_point_colors_and_logo() {
        let mut cfg = config(&["customers"], Vec::new());
        cfg.app_customization.primary_color = "#fff".into();
        cfg.app_customization.logo = Some("img/logo.png".into());

        let set = ArtifactGenerator::generate(&cfg, &shop()).unwrap();
        let page = &set.entry_point.contents;
        assert!(page.contains("--primary-color: #FFFFFF;"));
        assert!(page.contains("--primary-color-dark: #CCCCCC;"));
        assert!(page.contains(r#"<img src="img/logo.png""#));
        assert!(!page.contains("bi-database"));
        assert!(page.contains(r#"data-view="table-customers""#));

        let reference = regex::Regex::new(r#"(?:src|href)="([^"]+)""#).unwrap();
        let local: Vec<_> = reference
            .captures_iter(page)
            .map(|c| c[1].to_string())
            .filter(|r| !r.starts_with("https://") && r != "#" && r != "img/logo.png")
            .collect();
        assert_eq!(local, vec!["js/app.js"]);
        for path in &local {
            assert!(set.artifact(path).is_some(), "{} is referenced but not generated", path);
        }
    }

    #[test]
    fn test_missing_table_is_config_error() {
        let err = ArtifactGenerator::generate(&config(&["ghost"], Vec::new()), &shop()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_dialect_is_generation_error() {
        let mut cfg = config(&[], Vec::new());
        cfg.database_type = "oracle".into();
        let err = ArtifactGenerator::generate(&cfg, &shop()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
    }

    #[test]
    fn test_dialect_mismatch_is_config_error() {
        let mut cfg = config(&[], Vec::new());
        cfg.database_type = "mysql".into();
        let err = ArtifactGenerator::generate(&cfg, &shop()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_identifier_collision() {
        let snapshot = SchemaSnapshot::new(
            Dialect::Sqlite,
            vec![
                TableDescriptor::new("order_items", vec![column("id", "INTEGER", false, true)], None, Vec::new()),
                TableDescriptor::new("order items", vec![column("id", "INTEGER", false, true)], None, Vec::new()),
            ],
        );
        let err = ArtifactGenerator::generate(&config(&["order_items", "order items"], Vec::new()), &snapshot)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
    }

    #[test]
    fn test_synthesized_query_ids_never_collide() {
        let queries = vec![
            QueryDefinition::new("Sales", "SELECT 1"),
            QueryDefinition::new("Sales", "SELECT 2"),
            QueryDefinition::new("Sales2", "SELECT 3"),
            QueryDefinition::new("", "SELECT 4").with_id("top-customers"),
            QueryDefinition::new("Top Customers", "SELECT 5"),
        ];
        let set = ArtifactGenerator::generate(&config(&[], queries), &shop()).unwrap();

        let idents: HashSet<_> = set.entities.iter().map(|e| e.code_ident.as_str()).collect();
        assert_eq!(idents.len(), 5);
        assert!(set.entity("query-sales2_2").is_some());
        assert!(set.entity("query-top_customers_2").is_some());
    }

    #[test]
    fn test_unsafe_table_name() {
        let err = ArtifactGenerator::generate(&config(&["../etc"], Vec::new()), &shop()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
    }

    #[test]
    fn test_configuration_carries_allocated_ids() {
        let set = ArtifactGenerator::generate(
            &config(&[], vec![QueryDefinition::new("Top Customers", "SELECT 1")]),
            &shop(),
        )
        .unwrap();
        assert_eq!(
            set.configuration.custom_queries[0].id.as_deref(),
            Some("top_customers")
        );
        assert!(set.config_interchange.contents.contains("\"top_customers\""));
        assert!(set.config_native.contents.starts_with("<?php"));
    }
}
