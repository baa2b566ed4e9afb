//! Row inflation and relationship resolution for reads.

use super::Database;
use crate::catalog::{EntityBinding, TableSchema};
use crate::error::{Error, Result};
use crate::executor::Row;
use crate::query::{select, Clause, Select, Where};
use crate::value::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Whether relationships are resolved while inflating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fetch {
    Eager,
    Lazy,
}

/// `column = value` over the key columns present in `row`; `None` when a key
/// is missing or NULL.
fn row_key_condition(keys: &[String], row: &Row) -> Option<String> {
    let mut predicates = Vec::with_capacity(keys.len());
    for column in keys {
        match row.get(column) {
            Some(value) if !value.is_null() => predicates.push(value.equality(column)),
            _ => return None,
        }
    }
    if predicates.is_empty() {
        None
    } else {
        Some(predicates.join(" AND "))
    }
}

impl Database {
    /// Rows of `T` matching `query`, with relationships resolved.
    pub fn select<T: Any>(&self, query: &Where) -> Result<Vec<T>> {
        self.fetch(query, Fetch::Eager)
    }

    /// Rows of `T` matching one condition, with relationships resolved.
    pub fn select_where<T: Any>(&self, clause: Clause) -> Result<Vec<T>> {
        self.select(&Where::filter(clause))
    }

    /// Every row of `T`, with relationships resolved.
    pub fn fetch_all<T: Any>(&self) -> Result<Vec<T>> {
        self.select(&Where::new())
    }

    /// Rows of `T` matching `query`; relationship fields stay empty.
    pub fn lazy_fetch<T: Any>(&self, query: &Where) -> Result<Vec<T>> {
        self.fetch(query, Fetch::Lazy)
    }

    /// Run caller SQL and inflate each row into `T` without relationships.
    pub fn raw_select<T: Any>(&self, sql: &str) -> Result<Vec<T>> {
        let (schema, binding) = self.entity_of::<T>()?;
        debug!(sql = %sql, "raw select");
        let rows = self.executor.execute_query(sql)?;
        rows.iter()
            .map(|row| {
                let object = self.inflate(&schema, &binding, row, &mut Vec::new(), Fetch::Lazy)?;
                downcast(object, &binding)
            })
            .collect()
    }

    fn fetch<T: Any>(&self, query: &Where, mode: Fetch) -> Result<Vec<T>> {
        let (schema, binding) = self.entity_of::<T>()?;
        let rows = self.query_rows(&query.to_select(&schema.table_name))?;
        rows.iter()
            .map(|row| {
                let object = self.inflate(&schema, &binding, row, &mut Vec::new(), mode)?;
                downcast(object, &binding)
            })
            .collect()
    }

    fn query_rows(&self, spec: &Select) -> Result<Vec<Row>> {
        let sql = select(spec)?;
        debug!(sql = %sql, "select");
        self.executor.execute_query(&sql)
    }

    /// Build an object from a row. Columns the schema does not declare are
    /// ignored, which covers inherited key columns.
    fn inflate(
        &self,
        schema: &Arc<TableSchema>,
        binding: &EntityBinding,
        row: &Row,
        path: &mut Vec<String>,
        mode: Fetch,
    ) -> Result<Box<dyn Any>> {
        let mut object = binding.instantiate();
        for (name, value) in row.iter() {
            if let Some(column) = schema.column_by_name(name) {
                binding.set(object.as_mut(), &column.variable_name, value.clone())?;
            }
        }
        if mode == Fetch::Lazy {
            return Ok(object);
        }

        path.push(schema.table_name.clone());
        for relationship in schema.relationships() {
            let (target, target_binding) = self.target(schema, relationship)?;
            if path.contains(&target.table_name) {
                continue;
            }
            let related = if relationship.kind.is_dependent() {
                if !relationship.load {
                    continue;
                }
                self.load_dependents(schema, &target, &target_binding, row, path)?
            } else if relationship.load {
                self.load_owner(&target, &target_binding, row, path)?
            } else {
                self.inline_owner(&target, &target_binding, row, path)?
                    .into_iter()
                    .collect()
            };
            binding.set_related(object.as_mut(), &relationship.refer, related)?;
        }
        path.pop();
        Ok(object)
    }

    /// Children whose inherited key columns equal this row's transitive key.
    fn load_dependents(
        &self,
        schema: &TableSchema,
        target: &Arc<TableSchema>,
        target_binding: &EntityBinding,
        row: &Row,
        path: &mut Vec<String>,
    ) -> Result<Vec<Box<dyn Any>>> {
        let keys = self.key_columns(schema)?;
        let Some(condition) = row_key_condition(&keys, row) else {
            return Ok(Vec::new());
        };
        let rows = self.query_rows(&Select::new(target.table_name.clone()).with_where(condition))?;
        rows.iter()
            .map(|child| self.inflate(target, target_binding, child, path, Fetch::Eager))
            .collect()
    }

    /// The owner row this row's inherited key points at.
    fn load_owner(
        &self,
        target: &Arc<TableSchema>,
        target_binding: &EntityBinding,
        row: &Row,
        path: &mut Vec<String>,
    ) -> Result<Vec<Box<dyn Any>>> {
        let keys = self.key_columns(target)?;
        let Some(condition) = row_key_condition(&keys, row) else {
            return Ok(Vec::new());
        };
        let spec = Select::new(target.table_name.clone())
            .with_where(condition)
            .with_limit("1");
        match self.query_rows(&spec)?.first() {
            Some(owner) => Ok(vec![self.inflate(target, target_binding, owner, path, Fetch::Eager)?]),
            None => Ok(Vec::new()),
        }
    }

    /// An owner built from the key columns this row carries, without a query.
    ///
    /// Only primary-key fields are set; the owner's own owners are built the
    /// same way from the same row.
    fn inline_owner(
        &self,
        target: &Arc<TableSchema>,
        target_binding: &EntityBinding,
        row: &Row,
        path: &mut Vec<String>,
    ) -> Result<Option<Box<dyn Any>>> {
        let mut keys: Vec<(&str, Value)> = Vec::new();
        for column in target.primary_keys() {
            match row.get(&column.column_name) {
                Some(value) if !value.is_null() => {
                    keys.push((column.variable_name.as_str(), value.clone()))
                }
                _ => return Ok(None),
            }
        }
        if keys.is_empty() {
            return Ok(None);
        }

        let mut object = target_binding.instantiate();
        for (variable, value) in keys {
            target_binding.set(object.as_mut(), variable, value)?;
        }

        path.push(target.table_name.clone());
        for relationship in target.ownership_relationships() {
            let (owner, owner_binding) = self.target(target, relationship)?;
            if path.contains(&owner.table_name) {
                continue;
            }
            let related = self
                .inline_owner(&owner, &owner_binding, row, path)?
                .into_iter()
                .collect();
            target_binding.set_related(object.as_mut(), &relationship.refer, related)?;
        }
        path.pop();
        Ok(Some(object))
    }

    fn key_columns(&self, schema: &TableSchema) -> Result<Vec<String>> {
        Ok(self
            .registry
            .transitive_keys(schema)?
            .into_iter()
            .map(|c| c.column_name)
            .collect())
    }
}

fn downcast<T: Any>(object: Box<dyn Any>, binding: &EntityBinding) -> Result<T> {
    object
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::UnmappedType(binding.mapped_type().to_string()))
}
