//! FOREIGN KEY clause generation.

use crate::catalog::{SchemaRegistry, TableSchema};
use crate::error::Result;

/// FOREIGN KEY clauses for every many-to-one/many-to-many relationship, joined by `, `.
///
/// Each clause references the owner's full transitive key, so composite keys
/// inherited several levels up are carried through. Empty when the table has
/// no owners.
pub fn foreign_keys(registry: &SchemaRegistry, schema: &TableSchema) -> Result<String> {
    let clauses: Vec<String> = registry
        .ownership_keys(schema)?
        .iter()
        .filter(|group| !group.columns.is_empty())
        .map(|group| {
            let columns = group.column_names().join(", ");
            let mut clause = format!(
                "FOREIGN KEY({}) REFERENCES {}({})",
                columns, group.parent.table_name, columns
            );
            if let Some(action) = group.relationship.on_delete {
                clause.push_str(" ON DELETE ");
                clause.push_str(action.as_sql());
            }
            if let Some(action) = group.relationship.on_update {
                clause.push_str(" ON UPDATE ");
                clause.push_str(action.as_sql());
            }
            clause
        })
        .collect();
    Ok(clauses.join(", "))
}
