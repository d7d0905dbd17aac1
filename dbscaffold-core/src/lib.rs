//! Core library for dbscaffold.
//!
//! dbscaffold reads the schema of a live SQLite, MySQL or PostgreSQL
//! database, normalizes it into one dialect-independent model and renders a
//! self-contained CRUD web application (PHP handlers plus HTML/JS views)
//! for the tables and queries a user selects.
//!
//! # Flow
//! 1. [`connection::ConnectionProvider`] opens one connection per request
//! 2. [`introspect::introspect`] builds a [`models::SchemaSnapshot`] through
//!    the dialect's [`introspect::SchemaCatalog`]
//! 3. [`generator::ArtifactGenerator`] renders the application from an
//!    [`config::AppConfiguration`] and the snapshot
//! 4. [`generator::ArtifactWriter`] writes it to a fresh `app_<uuid>`
//!    directory
//!
//! [`pipeline::Pipeline`] strings these steps together and always closes
//! the connection it opened.
//!
//! # Guarantees
//! - Introspection only reads the system catalog
//! - SQLite files are never created and are opened read-only
//! - Passwords never appear in `Debug` output, errors or logs

pub mod config;
pub mod connection;
pub mod error;
pub mod generator;
pub mod identifiers;
pub mod introspect;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod relationships;
pub mod response;

// Re-export commonly used types
pub use config::{AppConfiguration, ConfigSerializer, ConnectionParams, QueryDefinition};
pub use connection::{Connection, ConnectionProvider, ConnectionSettings};
pub use error::{ErrorKind, Result, ScaffoldError};
pub use generator::{ArtifactGenerator, ArtifactWriter, GeneratedArtifactSet};
pub use identifiers::IdentifierAllocator;
pub use logging::init_logging;
pub use models::{
    ColumnDescriptor, Dialect, ForeignKeyDescriptor, RelationshipEdge, SchemaSnapshot,
    TableDescriptor,
};
pub use pipeline::{GenerationReport, Pipeline};
pub use response::Response;
