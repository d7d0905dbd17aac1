//! Generation request configuration and its runtime serialization.
//!
//! - [`AppConfiguration`]: the single root object of a generation request
//! - [`ConnectionParams`]: dialect-dependent connection descriptor
//! - [`ConfigSerializer`]: native (PHP) and interchange (JSON) snapshots

mod app;
mod serializer;

pub use app::{
    AppConfiguration, ConnectionParams, FieldOverride, QueryDefinition, UiCustomization,
    DEFAULT_ACCENT_COLOR, DEFAULT_APP_TITLE,
};
pub use serializer::{ConfigSerializer, RuntimeConfig, RuntimeDatabase, SerializedConfig, php_export};
pub(crate) use serializer::php_string;
