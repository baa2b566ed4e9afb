//! Relationship-aware persistence over a [`StorageExecutor`].
//!
//! A [`Database`] binds one [`DatabaseDescriptor`] to a schema registry and
//! an executor. Every operation asks the query builder for SQL text, runs it
//! through the executor and, for relationship-bearing types, recurses into
//! related schemas:
//!
//! - `save`/`update` cascade owners (many-to-one, many-to-many) before the
//!   row is written and dependents (one-to-one, one-to-many) after it, for
//!   relationships declared with `load`.
//! - Child rows carry their owners' transitive keys; an owner missing from
//!   the object is taken from the cascade that reached it.
//! - Eager `select` resolves relationships without re-entering a type that
//!   is already being resolved.

mod aggregate;
mod cascade;
mod fetch;
mod schema_ops;
mod transaction;

use crate::catalog::{
    DatabaseDescriptor, EntityBinding, Relationship, SchemaRegistry, SqliteTypeMapper,
    TableSchema, TypeMapper,
};
use crate::config::{EngineConfig, ForeignKeyMode};
use crate::error::{Error, Result};
use crate::events::DatabaseEvents;
use crate::executor::StorageExecutor;
use crate::query::foreign_keys_pragma;
use crate::value::Value;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use transaction::TransactionState;

/// An object together with the schema and accessors of its mapped type.
#[derive(Clone)]
struct Node<'a> {
    schema: Arc<TableSchema>,
    binding: Arc<EntityBinding>,
    object: &'a dyn Any,
}

impl<'a> Node<'a> {
    fn table(&self) -> &str {
        &self.schema.table_name
    }
}

/// `lineage` followed by `node`.
fn with_node<'a>(lineage: &[Node<'a>], node: &Node<'a>) -> Vec<Node<'a>> {
    let mut scope = lineage.to_vec();
    scope.push(node.clone());
    scope
}

fn on_path(scope: &[Node<'_>], table: &str) -> bool {
    scope.iter().any(|n| n.table() == table)
}

/// A database bound to a descriptor, a schema registry and a storage executor.
pub struct Database {
    descriptor: DatabaseDescriptor,
    registry: Arc<SchemaRegistry>,
    executor: Arc<dyn StorageExecutor>,
    events: Option<Arc<dyn DatabaseEvents>>,
    config: EngineConfig,
    mapper: Arc<dyn TypeMapper>,
    transactions: Mutex<TransactionState>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("descriptor", &self.descriptor)
            .field("config", &self.config)
            .field("transactions", &*self.transactions.lock())
            .finish()
    }
}

impl Database {
    /// Bind a descriptor to a registry and an executor.
    pub fn new(
        descriptor: DatabaseDescriptor,
        registry: Arc<SchemaRegistry>,
        executor: Arc<dyn StorageExecutor>,
    ) -> Self {
        Self {
            descriptor,
            registry,
            executor,
            events: None,
            config: EngineConfig::default(),
            mapper: Arc::new(SqliteTypeMapper),
            transactions: Mutex::new(TransactionState::default()),
        }
    }

    /// Set the lifecycle observer.
    pub fn with_events(mut self, events: Arc<dyn DatabaseEvents>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the type mapper.
    pub fn with_mapper(mut self, mapper: Arc<dyn TypeMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// The bound descriptor.
    pub fn descriptor(&self) -> &DatabaseDescriptor {
        &self.descriptor
    }

    /// The schema registry.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The storage executor.
    pub fn executor(&self) -> &Arc<dyn StorageExecutor> {
        &self.executor
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open or create the underlying database and apply connection settings.
    pub fn open(&self) -> Result<()> {
        self.executor.open_or_create(&self.descriptor)?;

        let locking = self.config.locking.unwrap_or(self.descriptor.locking_required);
        self.executor
            .execute_privileged_method("set_locking_enabled", Some(&Value::from(locking)))?;

        if self.config.foreign_keys == ForeignKeyMode::Native {
            self.executor.execute(&foreign_keys_pragma(true))?;
        }
        info!(
            database = %self.descriptor.name,
            version = self.descriptor.version,
            locking,
            foreign_keys = ?self.config.foreign_keys,
            "database opened"
        );
        Ok(())
    }

    /// Close the underlying database.
    pub fn close(&self) -> Result<()> {
        self.executor.close(&self.descriptor)?;
        debug!(database = %self.descriptor.name, "database closed");
        Ok(())
    }

    /// Schema and binding of a mapped type that belongs to this database.
    fn entity(&self, mapped_type: &str) -> Result<(Arc<TableSchema>, Arc<EntityBinding>)> {
        if !self.descriptor.contains(mapped_type) {
            let table = self
                .registry
                .table_for_type(mapped_type)
                .map(|s| s.table_name.clone())
                .unwrap_or_else(|_| mapped_type.to_string());
            return Err(Error::NoStorageBinding {
                database: self.descriptor.name.clone(),
                table,
            });
        }
        Ok((
            self.registry.table_for_type(mapped_type)?,
            self.registry.binding(mapped_type)?,
        ))
    }

    fn entity_of<T: Any>(&self) -> Result<(Arc<TableSchema>, Arc<EntityBinding>)> {
        let mapped_type = self.registry.mapped_type_of::<T>()?;
        self.entity(&mapped_type)
    }

    fn schema_of<T: Any>(&self) -> Result<Arc<TableSchema>> {
        self.entity_of::<T>().map(|(schema, _)| schema)
    }

    fn node<'a, T: Any>(&self, object: &'a T) -> Result<Node<'a>> {
        let (schema, binding) = self.entity_of::<T>()?;
        Ok(Node {
            schema,
            binding,
            object,
        })
    }

    /// Target schema and binding of a relationship.
    fn target(
        &self,
        schema: &TableSchema,
        relationship: &Relationship,
    ) -> Result<(Arc<TableSchema>, Arc<EntityBinding>)> {
        let target = self.registry.resolve(schema, relationship)?;
        self.entity(&target.mapped_type_name)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::executor::RecordingExecutor;

    #[derive(Debug, Default)]
    struct Stranger;

    #[test]
    fn test_open_applies_settings() {
        let (executor, database) = database(false);
        database.open().unwrap();
        assert_eq!(
            executor.privileged(),
            vec![("set_locking_enabled".to_string(), Some(Value::Integer(0)))]
        );
        assert_eq!(executor.statements(), vec!["PRAGMA foreign_keys=ON"]);
    }

    #[test]
    fn test_locking_override_and_trigger_mode() {
        let executor = Arc::new(RecordingExecutor::new());
        let database = Database::new(descriptor(), registry(false), executor.clone()).with_config(
            EngineConfig::default()
                .with_locking(true)
                .with_foreign_keys(ForeignKeyMode::Triggers),
        );
        database.open().unwrap();
        assert_eq!(executor.privileged()[0].1, Some(Value::Integer(1)));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_type_outside_descriptor() {
        let executor = Arc::new(RecordingExecutor::new());
        let database = Database::new(
            DatabaseDescriptor::new("other").with_table("Brand"),
            registry(false),
            executor,
        );
        let err = database.save(&beer()).unwrap_err();
        assert!(matches!(
            &err,
            Error::NoStorageBinding { database, table } if database == "other" && table == "LIQUOR"
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unbound_type() {
        let (_, database) = database(false);
        assert!(matches!(database.save(&Stranger), Err(Error::UnmappedType(_))));
    }
}
