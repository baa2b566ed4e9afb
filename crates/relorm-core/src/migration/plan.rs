//! Migration plan generation.
//!
//! A plan is the diff between the live database and the declared schema,
//! expressed as an ordered list of statements. Upgrades are additive: new
//! tables are created, missing columns are added as text, tables no longer
//! declared are dropped, and the version is stamped last.

use super::introspect::LiveSchema;
use crate::catalog::{DatabaseDescriptor, SchemaRegistry, TypeMapper};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::query::{alter_add_column, drop_table, set_version, table_statements};
use std::fmt;

/// The declared side of a migration.
#[derive(Clone, Copy)]
pub struct DeclaredSchema<'a> {
    /// Registry holding the declared table schemas.
    pub registry: &'a SchemaRegistry,
    /// Database whose tables are declared.
    pub descriptor: &'a DatabaseDescriptor,
    /// Foreign-key mode and bookkeeping tables.
    pub config: &'a EngineConfig,
    /// Storage types for new tables.
    pub mapper: &'a dyn TypeMapper,
}

/// One migration step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStep {
    /// Create a declared table missing from storage, with its indexes and triggers.
    CreateTable {
        /// Table name.
        table: String,
        /// Statements in execution order.
        statements: Vec<String>,
    },
    /// Add a declared column missing from a live table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// ALTER TABLE statement.
        sql: String,
    },
    /// Drop a live table that is no longer declared.
    DropTable {
        /// Table name.
        table: String,
        /// DROP TABLE statement.
        sql: String,
    },
    /// Stamp the declared version.
    SetVersion {
        /// Declared version.
        version: i64,
        /// Version pragma.
        sql: String,
    },
}

impl MigrationStep {
    /// Statements this step executes.
    pub fn statements(&self) -> Vec<&str> {
        match self {
            MigrationStep::CreateTable { statements, .. } => {
                statements.iter().map(String::as_str).collect()
            }
            MigrationStep::AddColumn { sql, .. }
            | MigrationStep::DropTable { sql, .. }
            | MigrationStep::SetVersion { sql, .. } => vec![sql.as_str()],
        }
    }

    /// Get a human-readable description.
    pub fn description(&self) -> String {
        match self {
            MigrationStep::CreateTable { table, statements } => {
                format!("create table {} ({} statements)", table, statements.len())
            }
            MigrationStep::AddColumn { table, column, .. } => {
                format!("add column {}.{}", table, column)
            }
            MigrationStep::DropTable { table, .. } => format!("drop table {}", table),
            MigrationStep::SetVersion { version, .. } => format!("set version {}", version),
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// A complete migration plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Stored version.
    pub from_version: i64,
    /// Declared version.
    pub to_version: i64,
    /// Ordered list of migration steps.
    pub steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    /// A plan that changes nothing.
    pub fn empty(version: i64) -> Self {
        Self {
            from_version: version,
            to_version: version,
            steps: Vec::new(),
        }
    }

    /// Diff `live` against `declared`.
    ///
    /// Equal versions give an empty plan without looking at tables. Declared
    /// tables are visited owners first.
    pub fn compute(live: &LiveSchema, declared: &DeclaredSchema<'_>) -> Result<Self> {
        let to_version = declared.descriptor.version;
        if live.version == to_version {
            return Ok(Self::empty(to_version));
        }

        let schemas = declared
            .descriptor
            .tables
            .iter()
            .map(|mapped_type| declared.registry.table_for_type(mapped_type))
            .collect::<Result<Vec<_>>>()?;
        let ordered = declared.registry.creation_order(&schemas)?;

        let mut steps = Vec::new();
        for schema in &ordered {
            match live.table(&schema.table_name) {
                Some(existing) => {
                    for column in declared.registry.storage_columns(schema)? {
                        if !existing.has_column(&column.column_name) {
                            steps.push(MigrationStep::AddColumn {
                                table: schema.table_name.clone(),
                                sql: alter_add_column(&schema.table_name, &column.column_name),
                                column: column.column_name,
                            });
                        }
                    }
                }
                None => steps.push(MigrationStep::CreateTable {
                    table: schema.table_name.clone(),
                    statements: table_statements(
                        declared.registry,
                        schema,
                        declared.mapper,
                        declared.config.foreign_keys,
                    )?,
                }),
            }
        }

        for table in &live.tables {
            let declared_here = ordered
                .iter()
                .any(|s| s.table_name.eq_ignore_ascii_case(&table.name));
            if !declared_here && !declared.config.is_bookkeeping(&table.name) {
                steps.push(MigrationStep::DropTable {
                    table: table.name.clone(),
                    sql: drop_table(&table.name),
                });
            }
        }

        steps.push(MigrationStep::SetVersion {
            version: to_version,
            sql: set_version(to_version),
        });

        Ok(Self {
            from_version: live.version,
            to_version,
            steps,
        })
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every statement in execution order.
    pub fn statements(&self) -> Vec<&str> {
        self.steps.iter().flat_map(MigrationStep::statements).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, LogicalType, Relationship, SqliteTypeMapper, TableSchema};
    use crate::config::ForeignKeyMode;
    use crate::migration::LiveTable;

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .register(
                TableSchema::new("Brand", "Brand")
                    .with_column(Column::new("id", "BRAND_ID", LogicalType::Integer).with_primary_key()),
            )
            .unwrap();
        registry
            .register(
                TableSchema::new("Liquor", "Liquor")
                    .with_column(Column::new("id", "id", LogicalType::Integer).with_primary_key())
                    .with_column(Column::new("name", "name", LogicalType::String))
                    .with_column(Column::new("notes", "notes", LogicalType::String))
                    .with_relationship(Relationship::many_to_one("brand", "Brand")),
            )
            .unwrap();
        registry
    }

    fn live(version: i64, tables: &[(&str, &[&str])]) -> LiveSchema {
        LiveSchema {
            version,
            tables: tables
                .iter()
                .map(|(name, columns)| LiveTable {
                    name: name.to_string(),
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_same_version_is_empty() {
        let registry = registry();
        let descriptor = DatabaseDescriptor::new("cellar").with_version(2).with_table("Liquor");
        let config = EngineConfig::default();
        let declared = DeclaredSchema {
            registry: &registry,
            descriptor: &descriptor,
            config: &config,
            mapper: &SqliteTypeMapper,
        };
        let plan = MigrationPlan::compute(&live(2, &[]), &declared).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_add_missing_column() {
        let registry = registry();
        let descriptor = DatabaseDescriptor::new("cellar")
            .with_version(2)
            .with_table("Brand")
            .with_table("Liquor");
        let config = EngineConfig::default();
        let declared = DeclaredSchema {
            registry: &registry,
            descriptor: &descriptor,
            config: &config,
            mapper: &SqliteTypeMapper,
        };
        let live = live(
            1,
            &[
                ("Brand", &["BRAND_ID"]),
                ("Liquor", &["ID", "NAME", "BRAND_ID"]),
                ("sqlite_sequence", &["name", "seq"]),
            ],
        );

        let plan = MigrationPlan::compute(&live, &declared).unwrap();
        assert_eq!(plan.from_version, 1);
        assert_eq!(plan.to_version, 2);
        assert_eq!(
            plan.statements(),
            vec!["ALTER TABLE Liquor ADD COLUMN notes TEXT", "PRAGMA user_version=2"]
        );
    }

    #[test]
    fn test_create_and_drop_tables() {
        let registry = registry();
        let descriptor = DatabaseDescriptor::new("cellar")
            .with_version(3)
            .with_table("Liquor")
            .with_table("Brand");
        let config = EngineConfig::default().with_foreign_keys(ForeignKeyMode::Triggers);
        let declared = DeclaredSchema {
            registry: &registry,
            descriptor: &descriptor,
            config: &config,
            mapper: &SqliteTypeMapper,
        };
        let live = live(2, &[("Legacy", &["X"]), ("android_metadata", &["locale"])]);

        let plan = MigrationPlan::compute(&live, &declared).unwrap();
        let descriptions: Vec<String> = plan.steps.iter().map(|s| s.to_string()).collect();
        assert_eq!(descriptions[0], "create table Brand (1 statements)");
        assert!(descriptions[1].starts_with("create table Liquor"));
        assert_eq!(descriptions[2], "drop table Legacy");
        assert_eq!(descriptions[3], "set version 3");
        assert_eq!(plan.step_count(), 4);

        match &plan.steps[1] {
            MigrationStep::CreateTable { statements, .. } => {
                assert!(statements.iter().any(|s| s.contains("Liquor_Brand_insert_integrity")));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }
}
