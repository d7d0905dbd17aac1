//! Identifier allocation for queries and code identifiers for generated
//! artifacts.
//!
//! One [`IdentifierAllocator`] is created per generation run. It is seeded
//! with every explicit query id, so synthesized ids can never shadow an id
//! the user chose, and it is the only place ids are minted during the run.
//!
//! Generated class and function names are derived through [`code_ident`], so
//! ids are kept unique in that space too: `sales_2` and `sales2` would both
//! become `Sales2`.

use crate::config::QueryDefinition;
use crate::error::{Result, ScaffoldError};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Id used when a query has neither id nor a usable display name.
pub const FALLBACK_QUERY_ID: &str = "query";

#[allow(clippy::expect_used)]
fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid query id pattern"))
}

/// Registry of query ids used in one generation run.
#[derive(Debug, Clone, Default)]
pub struct IdentifierAllocator {
    used: HashSet<String>,
    idents: HashSet<String>,
}

impl IdentifierAllocator {
    /// Creates an allocator seeded with the explicit ids of `queries`.
    ///
    /// # Errors
    /// Returns a configuration error for ids outside `[A-Za-z0-9_-]`, and a
    /// generation error when two explicit ids are equal or map to the same
    /// code identifier.
    pub fn seeded(queries: &[QueryDefinition]) -> Result<Self> {
        let mut allocator = Self::default();
        for id in queries.iter().filter_map(QueryDefinition::explicit_id) {
            if !id_pattern().is_match(id) {
                return Err(ScaffoldError::configuration(format!(
                    "Query id '{}' may only contain letters, digits, '_' and '-'",
                    id
                )));
            }
            if allocator.used.contains(id) {
                return Err(ScaffoldError::generation(format!(
                    "Query id '{}' is used by more than one query",
                    id
                )));
            }
            if allocator.idents.contains(&code_ident(id)) {
                return Err(ScaffoldError::generation(format!(
                    "Query id '{}' maps to the code identifier '{}' of another query",
                    id,
                    code_ident(id)
                )));
            }
            allocator.claim(id);
        }
        Ok(allocator)
    }

    fn is_taken(&self, id: &str) -> bool {
        self.used.contains(id) || self.idents.contains(&code_ident(id))
    }

    fn claim(&mut self, id: &str) {
        self.used.insert(id.to_string());
        self.idents.insert(code_ident(id));
    }

    /// Returns the definition with a guaranteed non-empty id.
    ///
    /// Definitions that already carry an id are returned unchanged. Others
    /// get a slug of their display name, suffixed `_2`, `_3`, ... until
    /// neither the id nor its code identifier is used in this run.
    pub fn ensure_id(&mut self, mut query: QueryDefinition) -> QueryDefinition {
        if query.explicit_id().is_some() {
            return query;
        }

        let base = query
            .name
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_QUERY_ID.to_string());

        let mut candidate = base.clone();
        let mut suffix: u32 = 2;
        while self.is_taken(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix = suffix.saturating_add(1);
        }

        tracing::debug!("Allocated query id '{}'", candidate);
        self.claim(&candidate);
        query.id = Some(candidate);
        query
    }

    /// Allocates ids for every query of a run, in order.
    ///
    /// # Errors
    /// See [`IdentifierAllocator::seeded`].
    pub fn allocate_all(queries: &[QueryDefinition]) -> Result<Vec<QueryDefinition>> {
        let mut allocator = Self::seeded(queries)?;
        Ok(queries
            .iter()
            .cloned()
            .map(|q| allocator.ensure_id(q))
            .collect())
    }
}

/// Lower-case ASCII slug: `"Top Customers!"` becomes `"top_customers"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

/// PascalCase identifier safe for JavaScript and PHP names.
///
/// `order_items` becomes `OrderItems`. Characters outside ASCII
/// alphanumerics start a new word; non-ASCII ones are kept as `U<hex>`.
pub fn code_ident(name: &str) -> String {
    let mut ident = String::with_capacity(name.len());
    let mut word_start = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if word_start {
                ident.push(c.to_ascii_uppercase());
            } else {
                ident.push(c);
            }
            word_start = false;
        } else {
            if !c.is_ascii() {
                ident.push_str(&format!("U{:X}", u32::from(c)));
            }
            word_start = true;
        }
    }
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, 'T');
    }
    ident
}

/// Checks that a name can be used as a file name inside the output tree
/// and embedded in generated string literals.
///
/// # Errors
/// Returns a generation error for empty names, path separators, `..`,
/// quotes and control characters.
pub fn ensure_safe_file_name(name: &str) -> Result<()> {
    let unsafe_char = name
        .chars()
        .any(|c| c.is_control() || matches!(c, '/' | '\\' | '\'' | '"' | '`' | '<' | '>'));
    if name.trim().is_empty() || name.contains("..") || name.starts_with('.') || unsafe_char {
        return Err(ScaffoldError::generation(format!(
            "'{}' cannot be used as an artifact file name",
            name.escape_debug()
        )));
    }
    Ok(())
}
