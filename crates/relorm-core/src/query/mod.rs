//! SQL query builder.
//!
//! Pure functions from typed option records to SQL text. Nothing here talks
//! to storage; the engine and the migration planner feed the output to a
//! [`StorageExecutor`](crate::executor::StorageExecutor).

mod aggregate;
mod clause;
mod ddl;
mod dml;
mod foreign_key;
mod trigger;

pub use aggregate::{aggregate, Aggregate, AggregateFunction};
pub use clause::{Clause, Where};
pub use ddl::{
    alter_add_column, create_index, create_table, drop_index, drop_table, fetch_version,
    foreign_keys_pragma, list_tables, set_version, table_info, table_statements, ColumnDef,
    CreateIndex, CreateTable,
};
pub use dml::{delete, insert_bind, select, update_bind, OrderDirection, Select};
pub use foreign_key::foreign_keys;
pub use trigger::{
    trigger_on_delete_cascade, trigger_on_delete_or_update_set_null, trigger_on_delete_restrict,
    trigger_on_insert_enforce_integrity, trigger_on_update_cascade,
    trigger_on_update_enforce_integrity, triggers, TriggerEvent, TriggerSpec,
};
