//! Database lifecycle callbacks.

use crate::catalog::{DatabaseDescriptor, Index, TableSchema};

/// Observer of schema lifecycle changes made through a [`Database`](crate::engine::Database).
///
/// Every method has a no-op default.
pub trait DatabaseEvents: Send + Sync {
    /// All tables of a database were created.
    fn on_database_created(&self, _database: &DatabaseDescriptor) {}

    /// All tables of a database were dropped.
    fn on_database_dropped(&self, _database: &DatabaseDescriptor) {}

    /// A table was created.
    fn on_table_created(&self, _database: &DatabaseDescriptor, _table: &TableSchema) {}

    /// A table was dropped.
    fn on_table_dropped(&self, _database: &DatabaseDescriptor, _table: &TableSchema) {}

    /// An index was created.
    fn on_index_created(&self, _database: &DatabaseDescriptor, _table: &TableSchema, _index: &Index) {}

    /// An index was dropped.
    fn on_index_dropped(&self, _database: &DatabaseDescriptor, _table: &TableSchema, _index: &Index) {}
}

/// Events that go nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl DatabaseEvents for NoopEvents {}
