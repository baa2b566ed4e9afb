//! Subcommand implementations.

use relorm_core::migration::LiveSchema;
use relorm_core::query::table_statements;
use relorm_core::{
    DatabaseDescriptor, EngineConfig, MigrationExecutor, MigrationPlan, MigrationResult,
    SchemaDocument, SchemaRegistry, SqliteTypeMapper, StorageExecutor,
};
use relorm_sqlite::SqliteExecutor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Engine failure.
    #[error(transparent)]
    Core(#[from] relorm_core::Error),

    /// Configuration file is not valid JSON.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// A schema document registered into a fresh registry.
pub struct LoadedSchema {
    /// Registry holding every table of the document.
    pub registry: Arc<SchemaRegistry>,
    /// The document's database.
    pub descriptor: DatabaseDescriptor,
}

impl LoadedSchema {
    /// Read and register a JSON schema document.
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let document = SchemaDocument::from_json(&read(path)?)?;
        let registry = Arc::new(SchemaRegistry::new());
        let descriptor = document.register(&registry)?;
        info!(
            database = %descriptor.name,
            version = descriptor.version,
            tables = descriptor.tables.len(),
            "schema loaded"
        );
        Ok(Self {
            registry,
            descriptor,
        })
    }
}

/// Engine configuration from an optional JSON file.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&read(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Every CREATE statement of the schema, owners first.
pub fn ddl(schema: &LoadedSchema, config: &EngineConfig) -> Result<Vec<String>, CliError> {
    let tables = schema
        .descriptor
        .tables
        .iter()
        .map(|mapped_type| schema.registry.table_for_type(mapped_type))
        .collect::<relorm_core::Result<Vec<_>>>()?;

    let mut statements = Vec::new();
    for table in schema.registry.creation_order(&tables)? {
        statements.extend(table_statements(
            &schema.registry,
            &table,
            &SqliteTypeMapper,
            config.foreign_keys,
        )?);
    }
    debug!(statements = statements.len(), "ddl rendered");
    Ok(statements)
}

fn connect(descriptor: &DatabaseDescriptor, db: &Path) -> Result<Arc<SqliteExecutor>, CliError> {
    let executor = Arc::new(SqliteExecutor::new());
    executor.open_or_create(&descriptor.clone().with_path(db))?;
    Ok(executor)
}

/// The plan that would bring `db` up to the schema's version.
pub fn plan(
    schema: &LoadedSchema,
    config: &EngineConfig,
    db: &Path,
) -> Result<MigrationPlan, CliError> {
    let executor = connect(&schema.descriptor, db)?;
    let migrations = MigrationExecutor::new(executor, Arc::clone(&schema.registry))
        .with_config(config.clone());
    Ok(migrations.plan(&schema.descriptor)?)
}

/// Upgrade `db` to the schema's version.
pub fn migrate(
    schema: &LoadedSchema,
    config: &EngineConfig,
    db: &Path,
) -> Result<MigrationResult, CliError> {
    let executor = connect(&schema.descriptor, db)?;
    let migrations = MigrationExecutor::new(executor.clone(), Arc::clone(&schema.registry))
        .with_config(config.clone());
    let result = migrations.upgrade(&schema.descriptor)?;
    executor.close(&schema.descriptor)?;
    Ok(result)
}

/// Stored schema version of `db`.
pub fn version(db: &Path) -> Result<i64, CliError> {
    let descriptor = DatabaseDescriptor::new("relorm");
    let executor = connect(&descriptor, db)?;
    let version = LiveSchema::version(executor.as_ref())?;
    executor.close(&descriptor)?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relorm_core::ForeignKeyMode;
    use std::io::Write;

    const SCHEMA: &str = r#"{
        "database": {"name": "cellar", "version": 2},
        "tables": [
            {
                "table_name": "Liquor",
                "mapped_type_name": "Liquor",
                "columns": [
                    {"variable_name": "id", "column_name": "id", "type": "integer", "primary_key": true},
                    {"variable_name": "name", "column_name": "name", "type": "string"}
                ],
                "relationships": [
                    {"kind": "many_to_one", "refer": "brand", "refer_to": "Brand", "on_delete": "cascade"}
                ]
            },
            {
                "table_name": "Brand",
                "mapped_type_name": "Brand",
                "columns": [
                    {"variable_name": "id", "column_name": "BRAND_ID", "type": "integer", "primary_key": true}
                ]
            }
        ]
    }"#;

    fn schema_file(dir: &Path) -> PathBuf {
        let path = dir.join("schema.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SCHEMA.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_ddl_orders_owners_first() {
        let dir = tempfile::tempdir().unwrap();
        let schema = LoadedSchema::from_path(&schema_file(dir.path())).unwrap();
        let statements = ddl(&schema, &EngineConfig::default()).unwrap();
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS Brand"));
        assert!(statements[1].contains("FOREIGN KEY(BRAND_ID) REFERENCES Brand(BRAND_ID) ON DELETE CASCADE"));

        let triggers = ddl(
            &schema,
            &EngineConfig::default().with_foreign_keys(ForeignKeyMode::Triggers),
        )
        .unwrap();
        assert!(triggers.iter().any(|s| s.contains("Liquor_Brand_delete_cascade")));
    }

    #[test]
    fn test_plan_then_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let schema = LoadedSchema::from_path(&schema_file(dir.path())).unwrap();
        let db = dir.path().join("cellar.db");
        let config = EngineConfig::default();

        let planned = plan(&schema, &config, &db).unwrap();
        assert_eq!(planned.from_version, 0);
        assert_eq!(version(&db).unwrap(), 0);

        let result = migrate(&schema, &config, &db).unwrap();
        assert_eq!(result.statements, planned.statements());
        assert_eq!(version(&db).unwrap(), 2);
        assert!(plan(&schema, &config, &db).unwrap().is_empty());
    }

    #[test]
    fn test_missing_schema_file() {
        let err = LoadedSchema::from_path(Path::new("/nonexistent/schema.json"))
            .err()
            .unwrap();
        assert!(matches!(err, CliError::Read { .. }));
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"foreign_keys": "triggers"}"#).unwrap();
        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.foreign_keys, ForeignKeyMode::Triggers);
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }
}
