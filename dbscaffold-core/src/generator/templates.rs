//! Askama templates for generated artifacts.
//!
//! PHP and view templates are rendered with escaping disabled: every value
//! reaching them is already a PHP literal, a JavaScript literal or escaped
//! HTML, built by the helpers at the bottom of this module. The entry point
//! uses the default HTML escaper.

use askama::Template;

/// One entry of the column whitelist of a table controller.
#[derive(Debug, Clone)]
pub(crate) struct HandlerColumn {
    /// Column name as a PHP string literal
    pub(crate) name: String,
    /// Quoted SQL identifier as a PHP string literal
    pub(crate) sql: String,
}

#[derive(Template)]
#[template(path = "table_handler.php", escape = "none")]
pub(crate) struct TableHandlerTemplate {
    pub(crate) class_name: String,
    pub(crate) table_sql: String,
    pub(crate) key_sql: String,
    pub(crate) key_name: String,
    pub(crate) columns: Vec<HandlerColumn>,
}

/// A listing column of a table view.
#[derive(Debug, Clone)]
pub(crate) struct ListColumn {
    /// Escaped header text
    pub(crate) label: String,
    /// Row key as a JavaScript string literal
    pub(crate) key_js: String,
}

/// One input of the create/edit form.
#[derive(Debug, Clone)]
pub(crate) struct FormField {
    /// Escaped column name
    pub(crate) name: String,
    /// Escaped label
    pub(crate) label: String,
    pub(crate) input_type: &'static str,
    pub(crate) multiline: bool,
    pub(crate) required: bool,
}

#[derive(Template)]
#[template(path = "table_view.html", escape = "none")]
pub(crate) struct TableViewTemplate {
    pub(crate) ident: String,
    pub(crate) label: String,
    pub(crate) handler_url: String,
    pub(crate) key_js: String,
    pub(crate) columns: Vec<ListColumn>,
    pub(crate) fields: Vec<FormField>,
}

#[derive(Template)]
#[template(path = "query_handler.php", escape = "none")]
pub(crate) struct QueryHandlerTemplate {
    pub(crate) class_name: String,
    pub(crate) sql: String,
}

#[derive(Template)]
#[template(path = "query_view.html", escape = "none")]
pub(crate) struct QueryViewTemplate {
    pub(crate) ident: String,
    pub(crate) label: String,
    pub(crate) handler_url: String,
}

/// Sidebar link of the entry point.
#[derive(Debug, Clone)]
pub(crate) struct SidebarEntry {
    pub(crate) view_id: String,
    pub(crate) label: String,
    pub(crate) icon: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) title: String,
    pub(crate) primary_color: String,
    pub(crate) primary_color_dark: String,
    pub(crate) logo: Option<String>,
    pub(crate) entries: Vec<SidebarEntry>,
    pub(crate) placeholder: Option<String>,
}

/// Escapes text for HTML element content and double-quoted attributes.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders text as a JavaScript string literal that is safe inside an
/// inline `<script>` block and inside an HTML attribute.
pub fn js_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len().saturating_add(2));
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\x22"),
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            '&' => out.push_str("\\x26"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Percent-encodes one URL path segment, keeping RFC 3986 unreserved bytes.
pub fn url_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
