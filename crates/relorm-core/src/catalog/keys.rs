//! Transitive primary keys over ownership edges.
//!
//! A table's transitive key is its own primary-key columns followed by the
//! transitive keys of every many-to-one/many-to-many target, depth first in
//! declaration order, without duplicates. Child tables carry their parents'
//! transitive keys as columns; the same traversal drives the FOREIGN KEY
//! clause, the trigger bodies, the inherited insert columns and the key
//! predicates of update/delete, so all of them agree by construction.

use super::column::Column;
use super::registry::SchemaRegistry;
use super::relation::Relationship;
use super::table::TableSchema;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Columns a table inherits through one ownership relationship.
#[derive(Debug, Clone)]
pub struct OwnershipKey {
    /// The many-to-one/many-to-many relationship.
    pub relationship: Relationship,
    /// Target (owner) schema.
    pub parent: Arc<TableSchema>,
    /// Owner's transitive key columns, as carried by the child.
    pub columns: Vec<Column>,
}

impl OwnershipKey {
    /// Column names in key order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_name.as_str()).collect()
    }
}

impl SchemaRegistry {
    /// Own primary keys plus, recursively, keys inherited from owners.
    ///
    /// Fails with [`Error::CyclicOwnership`] when ownership edges loop back.
    pub fn transitive_keys(&self, schema: &TableSchema) -> Result<Vec<Column>> {
        let mut path = Vec::new();
        self.collect_keys(schema, &mut path)
    }

    fn collect_keys(&self, schema: &TableSchema, path: &mut Vec<String>) -> Result<Vec<Column>> {
        if path.contains(&schema.table_name) {
            return Err(Error::CyclicOwnership {
                table: schema.table_name.clone(),
            });
        }
        path.push(schema.table_name.clone());

        let mut keys: Vec<Column> = schema.primary_keys().map(Column::inherited).collect();
        for relationship in schema.ownership_relationships() {
            let parent = self.resolve(schema, relationship)?;
            for column in self.collect_keys(&parent, path)? {
                push_unique(&mut keys, column);
            }
        }

        path.pop();
        Ok(keys)
    }

    /// Inherited key groups, one per ownership relationship in declaration order.
    pub fn ownership_keys(&self, schema: &TableSchema) -> Result<Vec<OwnershipKey>> {
        let mut path = vec![schema.table_name.clone()];
        let mut groups = Vec::new();
        for relationship in schema.ownership_relationships() {
            let parent = self.resolve(schema, relationship)?;
            let columns = self.collect_keys(&parent, &mut path)?;
            groups.push(OwnershipKey {
                relationship: relationship.clone(),
                parent,
                columns,
            });
        }
        Ok(groups)
    }

    /// Declared columns followed by inherited key columns not declared locally.
    ///
    /// This is the physical column list of the table.
    pub fn storage_columns(&self, schema: &TableSchema) -> Result<Vec<Column>> {
        let mut columns: Vec<Column> = schema.columns().to_vec();
        for group in self.ownership_keys(schema)? {
            for column in group.columns {
                push_unique(&mut columns, column);
            }
        }
        Ok(columns)
    }

    /// Order schemas so that every owner precedes the tables it owns.
    ///
    /// Owners outside `schemas` are not added.
    pub fn creation_order(&self, schemas: &[Arc<TableSchema>]) -> Result<Vec<Arc<TableSchema>>> {
        let mut ordered: Vec<Arc<TableSchema>> = Vec::with_capacity(schemas.len());
        let mut path = Vec::new();
        for schema in schemas {
            self.visit_owners(schema, schemas, &mut ordered, &mut path)?;
        }
        Ok(ordered)
    }

    fn visit_owners(
        &self,
        schema: &Arc<TableSchema>,
        scope: &[Arc<TableSchema>],
        ordered: &mut Vec<Arc<TableSchema>>,
        path: &mut Vec<String>,
    ) -> Result<()> {
        if ordered.iter().any(|s| s.table_name == schema.table_name) {
            return Ok(());
        }
        if path.contains(&schema.table_name) {
            return Err(Error::CyclicOwnership {
                table: schema.table_name.clone(),
            });
        }
        path.push(schema.table_name.clone());
        for relationship in schema.ownership_relationships() {
            let parent = self.resolve(schema, relationship)?;
            if scope.iter().any(|s| s.table_name == parent.table_name) {
                self.visit_owners(&parent, scope, ordered, path)?;
            }
        }
        path.pop();
        ordered.push(Arc::clone(schema));
        Ok(())
    }
}

fn push_unique(columns: &mut Vec<Column>, column: Column) {
    if !columns.iter().any(|c| c.column_name == column.column_name) {
        columns.push(column);
    }
}
