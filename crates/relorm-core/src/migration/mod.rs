//! Additive schema migration.
//!
//! The stored version (`PRAGMA user_version`) is compared with the
//! descriptor's declared version. When they differ the live tables are
//! introspected and diffed against the declared schemas:
//!
//! | Live state | Step |
//! |------------|------|
//! | declared table missing | create table, indexes, triggers |
//! | declared column missing | `ALTER TABLE ... ADD COLUMN ... TEXT` |
//! | table not declared | drop table (bookkeeping tables excepted) |
//! | always | stamp declared version |
//!
//! Steps run in order with no rollback. A failure is reported as
//! [`MigrationError::StepFailed`] with the failing statement.
//!
//! # Example
//!
//! ```ignore
//! use relorm_core::migration::MigrationExecutor;
//!
//! let migrations = MigrationExecutor::new(executor, registry);
//! let plan = migrations.plan(&descriptor)?;
//! for step in &plan.steps {
//!     println!("{}", step);
//! }
//! migrations.execute(&plan)?;
//! ```

mod error;
mod executor;
mod introspect;
mod plan;

pub use error::MigrationError;
pub use executor::{MigrationExecutor, MigrationResult};
pub use introspect::{LiveSchema, LiveTable};
pub use plan::{DeclaredSchema, MigrationPlan, MigrationStep};

use crate::catalog::{DatabaseDescriptor, SchemaRegistry};
use crate::error::Result;
use crate::executor::StorageExecutor;
use std::sync::Arc;

/// Upgrade `descriptor` in place with the default configuration.
pub fn upgrade(
    registry: Arc<SchemaRegistry>,
    executor: Arc<dyn StorageExecutor>,
    descriptor: &DatabaseDescriptor,
) -> Result<MigrationResult> {
    MigrationExecutor::new(executor, registry).upgrade(descriptor)
}
