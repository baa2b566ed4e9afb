//! Creating, dropping and upgrading schema objects.

use super::Database;
use crate::catalog::{Index, TableSchema};
use crate::error::{Error, Result};
use crate::migration::{MigrationError, MigrationExecutor, MigrationResult, MigrationStep};
use crate::query::{create_index, drop_index, drop_table, table_statements, CreateIndex};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

impl Database {
    /// Descriptor tables, owners first.
    fn ordered_tables(&self) -> Result<Vec<Arc<TableSchema>>> {
        let schemas = self
            .descriptor
            .tables
            .iter()
            .map(|mapped_type| self.entity(mapped_type).map(|(schema, _)| schema))
            .collect::<Result<Vec<_>>>()?;
        self.registry.creation_order(&schemas)
    }

    fn create_schema(&self, schema: &TableSchema) -> Result<()> {
        let statements =
            table_statements(&self.registry, schema, self.mapper.as_ref(), self.config.foreign_keys)?;
        for sql in &statements {
            debug!(sql = %sql, "ddl");
            self.executor.execute(sql)?;
        }
        self.table_created(schema);
        Ok(())
    }

    fn table_created(&self, schema: &TableSchema) {
        if let Some(events) = &self.events {
            events.on_table_created(&self.descriptor, schema);
            for index in schema.indexes() {
                events.on_index_created(&self.descriptor, schema, index);
            }
        }
    }

    fn drop_schema(&self, schema: &TableSchema) -> Result<()> {
        self.executor.execute(&drop_table(&schema.table_name))?;
        if let Some(events) = &self.events {
            events.on_table_dropped(&self.descriptor, schema);
        }
        Ok(())
    }

    /// Create every table of the descriptor with its indexes and, in trigger
    /// mode, its integrity triggers.
    pub fn create_tables(&self) -> Result<()> {
        let tables = self.ordered_tables()?;
        for schema in &tables {
            self.create_schema(schema)?;
        }
        self.executor
            .execute(&crate::query::set_version(self.descriptor.version))?;
        info!(
            database = %self.descriptor.name,
            tables = tables.len(),
            version = self.descriptor.version,
            "database created"
        );
        if let Some(events) = &self.events {
            events.on_database_created(&self.descriptor);
        }
        Ok(())
    }

    /// Create the table of `T`.
    pub fn create_table<T: Any>(&self) -> Result<()> {
        let schema = self.schema_of::<T>()?;
        self.create_schema(&schema)
    }

    /// Drop the table of `T`.
    pub fn drop_table<T: Any>(&self) -> Result<()> {
        let schema = self.schema_of::<T>()?;
        self.drop_schema(&schema)
    }

    /// Create an index on the table of `T`.
    pub fn create_index<T: Any>(&self, index: &Index) -> Result<()> {
        let schema = self.schema_of::<T>()?;
        self.executor
            .execute(&create_index(&CreateIndex::from_index(&schema.table_name, index)))?;
        if let Some(events) = &self.events {
            events.on_index_created(&self.descriptor, &schema, index);
        }
        Ok(())
    }

    /// Drop an index of the table of `T`.
    pub fn drop_index<T: Any>(&self, index: &Index) -> Result<()> {
        let schema = self.schema_of::<T>()?;
        self.executor.execute(&drop_index(&index.name))?;
        if let Some(events) = &self.events {
            events.on_index_dropped(&self.descriptor, &schema, index);
        }
        Ok(())
    }

    /// Drop every table of the descriptor, dependents first.
    pub fn drop_database(&self) -> Result<()> {
        for schema in self.ordered_tables()?.iter().rev() {
            self.drop_schema(schema)?;
        }
        info!(database = %self.descriptor.name, "database dropped");
        if let Some(events) = &self.events {
            events.on_database_dropped(&self.descriptor);
        }
        Ok(())
    }

    /// Bring storage up to the descriptor's version.
    ///
    /// Tables the upgrade creates are reported to the event sink, including
    /// those created before a failing step.
    pub fn upgrade(&self) -> Result<MigrationResult> {
        let migrations =
            MigrationExecutor::new(Arc::clone(&self.executor), Arc::clone(&self.registry))
                .with_config(self.config.clone())
                .with_mapper(Arc::clone(&self.mapper));
        let plan = migrations.plan(&self.descriptor)?;
        let outcome = migrations.execute(&plan);
        let applied = match &outcome {
            Ok(_) => plan.steps.len(),
            Err(Error::Migration(MigrationError::StepFailed { step_index, .. })) => *step_index,
            Err(_) => 0,
        };
        for step in &plan.steps[..applied] {
            if let MigrationStep::CreateTable { table, .. } = step {
                match self.registry.table(table) {
                    Some(schema) => self.table_created(&schema),
                    None => debug!(table = %table, "created table is not registered"),
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::Database;
    use crate::catalog::{DatabaseDescriptor, Index, TableSchema};
    use crate::config::{EngineConfig, ForeignKeyMode};
    use crate::events::DatabaseEvents;
    use crate::executor::RecordingExecutor;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl DatabaseEvents for Journal {
        fn on_database_created(&self, database: &DatabaseDescriptor) {
            self.0.lock().push(format!("database+ {}", database.name));
        }

        fn on_database_dropped(&self, database: &DatabaseDescriptor) {
            self.0.lock().push(format!("database- {}", database.name));
        }

        fn on_table_created(&self, _database: &DatabaseDescriptor, table: &TableSchema) {
            self.0.lock().push(format!("table+ {}", table.table_name));
        }

        fn on_table_dropped(&self, _database: &DatabaseDescriptor, table: &TableSchema) {
            self.0.lock().push(format!("table- {}", table.table_name));
        }

        fn on_index_created(&self, _database: &DatabaseDescriptor, _table: &TableSchema, index: &Index) {
            self.0.lock().push(format!("index+ {}", index.name));
        }
    }

    fn observed(config: EngineConfig) -> (Arc<RecordingExecutor>, Arc<Journal>, Database) {
        let executor = Arc::new(RecordingExecutor::new());
        let journal = Arc::new(Journal::default());
        let database = Database::new(descriptor(), registry(false), executor.clone())
            .with_config(config)
            .with_events(journal.clone());
        (executor, journal, database)
    }

    #[test]
    fn test_create_tables_owners_first() {
        let (executor, journal, database) = observed(EngineConfig::default());
        database.create_tables().unwrap();

        let statements = executor.statements();
        assert_eq!(statements.len(), 5);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS COMPANY"));
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS BRAND"));
        assert!(statements[2].starts_with("CREATE TABLE IF NOT EXISTS LIQUOR"));
        assert!(statements[3].starts_with("CREATE TABLE IF NOT EXISTS LOG"));
        assert_eq!(statements[4], "PRAGMA user_version=1");
        assert_eq!(
            *journal.0.lock(),
            vec!["table+ COMPANY", "table+ BRAND", "table+ LIQUOR", "table+ LOG", "database+ cellar"]
        );
    }

    #[test]
    fn test_trigger_mode_emits_triggers() {
        let (executor, _, database) =
            observed(EngineConfig::default().with_foreign_keys(ForeignKeyMode::Triggers));
        database.create_table::<Liquor>().unwrap();
        let statements = executor.statements();
        assert!(statements[0].contains("FOREIGN KEY(BRAND_ID, COMPANY_ID) REFERENCES BRAND"));
        assert!(statements.iter().any(|s| s.contains("LIQUOR_BRAND_insert_integrity")));
        assert!(statements.iter().any(|s| s.contains("LIQUOR_BRAND_delete_cascade")));
    }

    #[test]
    fn test_upgrade_reports_created_tables() {
        let (executor, journal, database) = observed(EngineConfig::default());
        let result = database.upgrade().unwrap();

        assert_eq!(result.to_version, 1);
        assert_eq!(
            executor.statements().last().map(String::as_str),
            Some("PRAGMA user_version=1")
        );
        assert_eq!(
            *journal.0.lock(),
            vec!["table+ COMPANY", "table+ BRAND", "table+ LIQUOR", "table+ LOG"]
        );
    }

    #[test]
    fn test_failed_upgrade_reports_tables_before_failure() {
        let (executor, journal, database) = observed(EngineConfig::default());
        let liquor = crate::query::table_statements(
            &database.registry,
            &database.registry.table("LIQUOR").unwrap(),
            database.mapper.as_ref(),
            database.config.foreign_keys,
        )
        .unwrap();
        executor.fail_on(liquor[0].clone(), "disk I/O error");

        assert!(database.upgrade().is_err());
        assert_eq!(*journal.0.lock(), vec!["table+ COMPANY", "table+ BRAND"]);
    }

    #[test]
    fn test_created_table_reports_indexes() {
        let registry = Arc::new(crate::catalog::SchemaRegistry::new());
        registry
            .register(
                TableSchema::new("TAG", "Tag")
                    .with_column(crate::catalog::Column::new(
                        "name",
                        "NAME",
                        crate::catalog::LogicalType::String,
                    ))
                    .with_index(Index::new("TAG_NAME").with_column("NAME")),
            )
            .unwrap();
        let journal = Arc::new(Journal::default());
        let database = Database::new(
            DatabaseDescriptor::new("tags").with_table("Tag"),
            registry,
            Arc::new(RecordingExecutor::new()),
        )
        .with_events(journal.clone());
        database.upgrade().unwrap();
        assert_eq!(*journal.0.lock(), vec!["table+ TAG", "index+ TAG_NAME"]);
    }

    #[test]
    fn test_indexes_and_drops() {
        let (executor, journal, database) = observed(EngineConfig::default());
        let index = Index::new("LIQUOR_NAME").with_column("NAME").with_unique();
        database.create_index::<Liquor>(&index).unwrap();
        database.drop_index::<Liquor>(&index).unwrap();
        database.drop_database().unwrap();

        assert_eq!(
            executor.statements(),
            vec![
                "CREATE UNIQUE INDEX IF NOT EXISTS LIQUOR_NAME ON LIQUOR(NAME)",
                "DROP INDEX IF EXISTS LIQUOR_NAME",
                "DROP TABLE IF EXISTS LOG",
                "DROP TABLE IF EXISTS LIQUOR",
                "DROP TABLE IF EXISTS BRAND",
                "DROP TABLE IF EXISTS COMPANY",
            ]
        );
        let journal = journal.0.lock();
        assert_eq!(journal[0], "index+ LIQUOR_NAME");
        assert_eq!(journal.last().map(String::as_str), Some("database- cellar"));
    }
}
