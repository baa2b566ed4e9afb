//! relorm core: schema model, SQL query builder and relationship cascade engine.
//!
//! Tables, columns, indexes and relationships are declared as
//! [`TableSchema`]s and registered in a [`SchemaRegistry`] together with an
//! [`EntityBinding`] per Rust type. A [`Database`] then maps objects to rows
//! through a [`StorageExecutor`], cascading relationships and carrying
//! composite owner keys into child tables.
//!
//! ```ignore
//! let registry = Arc::new(SchemaRegistry::new());
//! registry.register(brand_schema)?;
//! registry.register(liquor_schema)?;
//! registry.bind(liquor_binding)?;
//!
//! let database = Database::new(descriptor, registry, executor);
//! database.open()?;
//! database.upgrade()?;
//! database.save(&liquor)?;
//! let beers: Vec<Liquor> = database.select_where(Clause::like("NAME", "B%"))?;
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod migration;
pub mod query;
pub mod value;

pub use catalog::{
    BindingBuilder, Column, DatabaseDescriptor, EntityBinding, Index, LogicalType, OwnershipKey,
    ReferentialAction, RelationKind, Relationship, SchemaDocument, SchemaRegistry,
    SqliteTypeMapper, TableSchema, TypeMapper,
};
pub use config::{EngineConfig, ForeignKeyMode};
pub use engine::Database;
pub use error::{Error, Result};
pub use events::{DatabaseEvents, NoopEvents};
pub use executor::{RecordingExecutor, Row, StorageExecutor};
pub use migration::{MigrationError, MigrationExecutor, MigrationPlan, MigrationResult, MigrationStep};
pub use query::{Clause, OrderDirection, Where};
pub use value::{FromValue, Value};
