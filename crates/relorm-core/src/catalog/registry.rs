//! Schema registry: the arena of table schemas and entity bindings.

use super::binding::EntityBinding;
use super::relation::Relationship;
use super::table::TableSchema;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Registry of table schemas and entity bindings.
///
/// Schemas are addressed by table name, mapped type name and source path.
/// Bindings are addressed by mapped type name and by Rust type. The
/// registry is populated at startup and read concurrently afterwards.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Schemas by table name.
    tables: DashMap<String, Arc<TableSchema>>,
    /// Table name by mapped type name.
    by_type: DashMap<String, String>,
    /// Table name by descriptor source path.
    by_source: DashMap<String, String>,
    /// Bindings by mapped type name.
    bindings: DashMap<String, Arc<EntityBinding>>,
    /// Mapped type name by Rust type.
    type_ids: DashMap<TypeId, String>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    /// Validate and register a schema, replacing any schema with the same table name.
    pub fn register(&self, schema: TableSchema) -> Result<Arc<TableSchema>> {
        schema.validate()?;
        let schema = Arc::new(schema);
        let table = schema.table_name.clone();

        self.by_type
            .insert(schema.mapped_type_name.clone(), table.clone());
        if let Some(source) = &schema.source {
            self.by_source.insert(source.clone(), table.clone());
        }
        self.tables.insert(table.clone(), Arc::clone(&schema));

        info!(
            table = %table,
            mapped_type = %schema.mapped_type_name,
            columns = schema.columns().len(),
            relationships = schema.relationships().len(),
            "registered table schema"
        );
        Ok(schema)
    }

    /// Register the accessor table for a mapped type.
    ///
    /// The type's schema must already be registered, and every declared
    /// column and relationship needs an accessor.
    pub fn bind(&self, binding: EntityBinding) -> Result<()> {
        let schema = self.table_for_type(binding.mapped_type())?;
        for column in schema.columns() {
            if !binding.has_field(&column.variable_name) {
                return Err(Error::MissingAccessor {
                    mapped_type: binding.mapped_type().to_string(),
                    name: column.variable_name.clone(),
                });
            }
        }
        for relationship in schema.relationships() {
            if !binding.has_relation(&relationship.refer) {
                return Err(Error::MissingAccessor {
                    mapped_type: binding.mapped_type().to_string(),
                    name: relationship.refer.clone(),
                });
            }
        }

        debug!(
            mapped_type = %binding.mapped_type(),
            rust_type = binding.type_name(),
            "bound entity accessors"
        );
        self.type_ids
            .insert(binding.type_id(), binding.mapped_type().to_string());
        self.bindings
            .insert(binding.mapped_type().to_string(), Arc::new(binding));
        Ok(())
    }

    /// Look up a schema by table name.
    pub fn table(&self, table_name: &str) -> Option<Arc<TableSchema>> {
        self.tables.get(table_name).map(|s| Arc::clone(s.value()))
    }

    /// Look up a schema by mapped type name.
    pub fn table_for_type(&self, mapped_type: &str) -> Result<Arc<TableSchema>> {
        let table = self
            .by_type
            .get(mapped_type)
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::UnmappedType(mapped_type.to_string()))?;
        self.table(&table)
            .ok_or_else(|| Error::UnmappedType(mapped_type.to_string()))
    }

    /// Look up a schema by descriptor source path.
    pub fn table_for_source(&self, source: &str) -> Option<Arc<TableSchema>> {
        let table = self.by_source.get(source).map(|t| t.value().clone())?;
        self.table(&table)
    }

    /// Binding for a mapped type name.
    pub fn binding(&self, mapped_type: &str) -> Result<Arc<EntityBinding>> {
        self.bindings
            .get(mapped_type)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| Error::UnmappedType(mapped_type.to_string()))
    }

    /// Mapped type name bound to a Rust type.
    pub fn mapped_type_of<T: Any>(&self) -> Result<String> {
        self.type_ids
            .get(&TypeId::of::<T>())
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::UnmappedType(std::any::type_name::<T>().to_string()))
    }

    /// Schema and binding for a Rust type.
    pub fn entity_of<T: Any>(&self) -> Result<(Arc<TableSchema>, Arc<EntityBinding>)> {
        let mapped_type = self.mapped_type_of::<T>()?;
        Ok((self.table_for_type(&mapped_type)?, self.binding(&mapped_type)?))
    }

    /// All registered schemas, ordered by table name.
    pub fn tables(&self) -> Vec<Arc<TableSchema>> {
        let mut tables: Vec<_> = self.tables.iter().map(|s| Arc::clone(s.value())).collect();
        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        tables
    }

    /// Resolve a relationship's target schema, caching the table name on the relationship.
    pub fn resolve(
        &self,
        owner: &TableSchema,
        relationship: &Relationship,
    ) -> Result<Arc<TableSchema>> {
        let unresolved = || Error::UnresolvedRelationship {
            table: owner.table_name.clone(),
            refer: relationship.refer.clone(),
            refer_to: relationship.refer_to.clone(),
        };
        let table = relationship.resolve_with(|| {
            self.by_type
                .get(&relationship.refer_to)
                .map(|t| t.value().clone())
                .ok_or_else(unresolved)
        })?;
        self.table(table).ok_or_else(unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, LogicalType};

    #[derive(Debug, Default)]
    struct Brand {
        id: i64,
    }

    fn brand_schema() -> TableSchema {
        TableSchema::new("BRAND", "Brand")
            .with_source("descriptors/brand.json")
            .with_column(Column::new("id", "BRAND_ID", LogicalType::Integer).with_primary_key())
            .with_relationship(Relationship::one_to_many("liquors", "Liquor"))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = SchemaRegistry::new();
        registry.register(brand_schema()).unwrap();

        assert!(registry.table("BRAND").is_some());
        assert_eq!(registry.table_for_type("Brand").unwrap().table_name, "BRAND");
        assert!(registry.table_for_source("descriptors/brand.json").is_some());
        assert!(matches!(
            registry.table_for_type("Liquor"),
            Err(Error::UnmappedType(_))
        ));
    }

    #[test]
    fn test_bind_requires_accessors() {
        let registry = SchemaRegistry::new();
        registry.register(brand_schema()).unwrap();

        let incomplete = EntityBinding::builder("Brand", Brand::default)
            .field("id", |b: &Brand| b.id, |b, v| b.id = v)
            .build();
        let err = registry.bind(incomplete).unwrap_err();
        assert!(matches!(err, Error::MissingAccessor { ref name, .. } if name == "liquors"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bind_unregistered_type() {
        let registry = SchemaRegistry::new();
        let binding = EntityBinding::builder("Brand", Brand::default).build();
        assert!(matches!(registry.bind(binding), Err(Error::UnmappedType(_))));
    }

    #[test]
    fn test_unresolved_relationship() {
        let registry = SchemaRegistry::new();
        let brand = registry.register(brand_schema()).unwrap();
        let rel = &brand.relationships()[0];

        let err = registry.resolve(&brand, rel).unwrap_err();
        assert!(matches!(err, Error::UnresolvedRelationship { ref refer_to, .. } if refer_to == "Liquor"));
        assert!(rel.resolved_target().is_none());
    }

    #[test]
    fn test_resolution_is_cached_on_relationship() {
        let registry = SchemaRegistry::new();
        let brand = registry.register(brand_schema()).unwrap();
        registry
            .register(
                TableSchema::new("LIQUOR", "Liquor")
                    .with_column(Column::new("id", "ID", LogicalType::Integer).with_primary_key()),
            )
            .unwrap();

        let rel = &brand.relationships()[0];
        let first = registry.resolve(&brand, rel).unwrap();
        let second = registry.resolve(&brand, rel).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(rel.resolved_target(), Some("LIQUOR"));
    }
}
