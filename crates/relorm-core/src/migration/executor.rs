//! Migration executor: plans against live storage and applies the plan.

use super::error::MigrationError;
use super::introspect::LiveSchema;
use super::plan::{DeclaredSchema, MigrationPlan};
use crate::catalog::{DatabaseDescriptor, SchemaRegistry, SqliteTypeMapper, TypeMapper};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::StorageExecutor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a migration execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Stored version before the upgrade.
    pub from_version: i64,
    /// Version after the upgrade.
    pub to_version: i64,
    /// Steps executed.
    pub steps_executed: usize,
    /// Statements executed, in order.
    pub statements: Vec<String>,
}

/// Plans and applies additive schema upgrades.
pub struct MigrationExecutor {
    executor: Arc<dyn StorageExecutor>,
    registry: Arc<SchemaRegistry>,
    config: EngineConfig,
    mapper: Arc<dyn TypeMapper>,
}

impl MigrationExecutor {
    /// Create an executor with the default configuration and SQLite types.
    pub fn new(executor: Arc<dyn StorageExecutor>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            executor,
            registry,
            config: EngineConfig::default(),
            mapper: Arc::new(SqliteTypeMapper),
        }
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the type mapper used for new tables.
    pub fn with_mapper(mut self, mapper: Arc<dyn TypeMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Plan the upgrade of `descriptor` from its stored version.
    pub fn plan(&self, descriptor: &DatabaseDescriptor) -> Result<MigrationPlan> {
        let version = LiveSchema::version(self.executor.as_ref())?;
        if version == descriptor.version {
            debug!(database = %descriptor.name, version, "schema is current");
            return Ok(MigrationPlan::empty(version));
        }

        let live = LiveSchema::read(self.executor.as_ref())?;
        let declared = DeclaredSchema {
            registry: &self.registry,
            descriptor,
            config: &self.config,
            mapper: self.mapper.as_ref(),
        };
        MigrationPlan::compute(&live, &declared)
    }

    /// Apply a plan step by step, stopping at the first failure.
    ///
    /// Steps already applied stay applied.
    pub fn execute(&self, plan: &MigrationPlan) -> Result<MigrationResult> {
        let mut statements = Vec::new();
        for (step_index, step) in plan.steps.iter().enumerate() {
            debug!(step = step_index, "{}", step);
            for sql in step.statements() {
                if let Err(source) = self.executor.execute(sql) {
                    warn!(
                        step = step_index,
                        sql = %sql,
                        error = %source,
                        "migration step failed"
                    );
                    return Err(MigrationError::StepFailed {
                        step_index,
                        sql: sql.to_string(),
                        source: Box::new(source),
                    }
                    .into());
                }
                statements.push(sql.to_string());
            }
        }

        if !plan.is_empty() {
            info!(
                from_version = plan.from_version,
                to_version = plan.to_version,
                steps = plan.steps.len(),
                "schema upgraded"
            );
        }
        Ok(MigrationResult {
            from_version: plan.from_version,
            to_version: plan.to_version,
            steps_executed: plan.steps.len(),
            statements,
        })
    }

    /// Plan and apply in one call.
    pub fn upgrade(&self, descriptor: &DatabaseDescriptor) -> Result<MigrationResult> {
        let plan = self.plan(descriptor)?;
        self.execute(&plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, LogicalType, TableSchema};
    use crate::error::Error;
    use crate::executor::{RecordingExecutor, Row};
    use crate::query::{fetch_version, list_tables, table_info};

    fn setup(live_version: i64) -> (Arc<RecordingExecutor>, MigrationExecutor) {
        let registry = Arc::new(SchemaRegistry::new());
        registry
            .register(
                TableSchema::new("Liquor", "Liquor")
                    .with_column(Column::new("id", "id", LogicalType::Integer).with_primary_key())
                    .with_column(Column::new("notes", "notes", LogicalType::String)),
            )
            .unwrap();

        let recording = Arc::new(RecordingExecutor::new());
        recording.respond(
            fetch_version(),
            vec![Row::new().with_column("user_version", live_version)],
        );
        recording.respond(list_tables(), vec![Row::new().with_column("name", "Liquor")]);
        recording.respond(table_info("Liquor"), vec![Row::new().with_column("name", "id")]);

        let executor = MigrationExecutor::new(recording.clone(), registry);
        (recording, executor)
    }

    #[test]
    fn test_current_schema_skips_introspection() {
        let (recording, executor) = setup(2);
        let descriptor = DatabaseDescriptor::new("cellar").with_version(2).with_table("Liquor");
        let result = executor.upgrade(&descriptor).unwrap();
        assert_eq!(result.steps_executed, 0);
        assert_eq!(recording.statements(), vec![fetch_version()]);
    }

    #[test]
    fn test_upgrade_applies_plan() {
        let (recording, executor) = setup(1);
        let descriptor = DatabaseDescriptor::new("cellar").with_version(2).with_table("Liquor");
        let result = executor.upgrade(&descriptor).unwrap();
        assert_eq!(result.from_version, 1);
        assert_eq!(
            result.statements,
            vec!["ALTER TABLE Liquor ADD COLUMN notes TEXT", "PRAGMA user_version=2"]
        );
        assert!(recording
            .statements()
            .ends_with(&result.statements.clone()));
    }

    #[test]
    fn test_failure_reports_step_and_sql() {
        let (recording, executor) = setup(1);
        recording.fail_on("PRAGMA user_version=2", "disk I/O error");
        let descriptor = DatabaseDescriptor::new("cellar").with_version(2).with_table("Liquor");

        let err = executor.upgrade(&descriptor).unwrap_err();
        match &err {
            Error::Migration(MigrationError::StepFailed { step_index, sql, .. }) => {
                assert_eq!(*step_index, 1);
                assert_eq!(sql, "PRAGMA user_version=2");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.sql(), Some("PRAGMA user_version=2"));
        assert!(recording
            .statements()
            .contains(&"ALTER TABLE Liquor ADD COLUMN notes TEXT".to_string()));
    }
}
