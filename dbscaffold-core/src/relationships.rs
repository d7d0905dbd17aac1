//! Relationship derivation from declared foreign keys.
//!
//! Relationships are a flat report: one edge per foreign key, in
//! table-then-key order. Edges are not deduplicated and cycles are not
//! detected.

use crate::models::{RelationshipEdge, SchemaSnapshot, TableDescriptor};
use indexmap::IndexMap;

/// Derives the relationship edges of a snapshot.
///
/// Pure and idempotent: the same snapshot always yields the same sequence.
pub fn resolve(snapshot: &SchemaSnapshot) -> Vec<RelationshipEdge> {
    resolve_tables(snapshot.tables())
}

pub(crate) fn resolve_tables(tables: &IndexMap<String, TableDescriptor>) -> Vec<RelationshipEdge> {
    tables
        .iter()
        .flat_map(|(table_name, table)| {
            table.foreign_keys.iter().map(move |fk| RelationshipEdge {
                from_table: table_name.clone(),
                from_column: fk.column.clone(),
                to_table: fk.referenced_table.clone(),
                to_column: fk.referenced_column.clone(),
            })
        })
        .collect()
}
