//! DDL and introspection statements.

use super::foreign_key::foreign_keys;
use super::trigger::triggers;
use crate::catalog::{Index, SchemaRegistry, TableSchema, TypeMapper};
use crate::config::ForeignKeyMode;
use crate::error::Result;
use crate::value::quote_literal;

/// One column definition inside CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Storage column type.
    pub sql_type: String,
    /// Emit NOT NULL.
    pub not_null: bool,
    /// Default value, emitted as a quoted literal.
    pub default_value: Option<String>,
    /// CHECK expression, emitted verbatim.
    pub check: Option<String>,
}

/// Options of a CREATE TABLE statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTable {
    /// Table name.
    pub table: String,
    /// Column definitions in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Columns of the composite primary key.
    pub primary_keys: Vec<String>,
    /// Columns of the composite unique constraint.
    pub unique_columns: Vec<String>,
    /// FOREIGN KEY clause list, appended verbatim when non-empty.
    pub foreign_keys: String,
}

impl CreateTable {
    /// Build the options for a registered schema, including inherited key columns.
    pub fn from_schema(
        registry: &SchemaRegistry,
        schema: &TableSchema,
        mapper: &dyn TypeMapper,
    ) -> Result<Self> {
        let columns = registry.storage_columns(schema)?;
        Ok(Self {
            table: schema.table_name.clone(),
            columns: columns
                .iter()
                .map(|c| ColumnDef {
                    name: c.column_name.clone(),
                    sql_type: mapper.storage_type(c.logical_type).to_string(),
                    not_null: c.not_null,
                    default_value: c.default_value.clone(),
                    check: c.check.clone(),
                })
                .collect(),
            primary_keys: columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.column_name.clone())
                .collect(),
            unique_columns: columns
                .iter()
                .filter(|c| c.unique)
                .map(|c| c.column_name.clone())
                .collect(),
            foreign_keys: foreign_keys(registry, schema)?,
        })
    }
}

/// Options of a CREATE INDEX statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndex {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// Emit UNIQUE.
    pub unique: bool,
}

impl CreateIndex {
    /// Options for a declared index.
    pub fn from_index(table: &str, index: &Index) -> Self {
        Self {
            name: index.name.clone(),
            table: table.to_string(),
            columns: index.columns.clone(),
            unique: index.unique,
        }
    }
}

/// `CREATE TABLE IF NOT EXISTS ...`
pub fn create_table(spec: &CreateTable) -> String {
    let mut parts: Vec<String> = spec
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", c.name, c.sql_type);
            if c.not_null {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default_value {
                def.push_str(" DEFAULT ");
                def.push_str(&quote_literal(default));
            }
            if let Some(check) = &c.check {
                def.push_str(&format!(" CHECK({})", check));
            }
            def
        })
        .collect();

    if !spec.primary_keys.is_empty() {
        parts.push(format!("PRIMARY KEY({})", spec.primary_keys.join(", ")));
    }
    if !spec.unique_columns.is_empty() {
        parts.push(format!("UNIQUE({})", spec.unique_columns.join(", ")));
    }
    if !spec.foreign_keys.is_empty() {
        parts.push(spec.foreign_keys.clone());
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        spec.table,
        parts.join(", ")
    )
}

/// `CREATE [UNIQUE ]INDEX IF NOT EXISTS ...`
pub fn create_index(spec: &CreateIndex) -> String {
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {}({})",
        if spec.unique { "UNIQUE " } else { "" },
        spec.name,
        spec.table,
        spec.columns.join(", ")
    )
}

/// `DROP INDEX IF EXISTS ...`
pub fn drop_index(name: &str) -> String {
    format!("DROP INDEX IF EXISTS {}", name)
}

/// `DROP TABLE IF EXISTS ...`
pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", table)
}

/// Add a column as generic text; additive upgrades never carry type or constraints.
pub fn alter_add_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} TEXT", table, column)
}

/// Live column list of a table.
pub fn table_info(table: &str) -> String {
    format!("PRAGMA table_info({})", table)
}

/// Stored schema version.
pub fn fetch_version() -> String {
    "PRAGMA user_version;".to_string()
}

/// Store the schema version.
pub fn set_version(version: i64) -> String {
    format!("PRAGMA user_version={}", version)
}

/// Live tables from the master schema table.
pub fn list_tables() -> String {
    "SELECT * FROM sqlite_master WHERE type='table'".to_string()
}

/// Toggle native foreign-key enforcement.
pub fn foreign_keys_pragma(enabled: bool) -> String {
    format!("PRAGMA foreign_keys={}", if enabled { "ON" } else { "OFF" })
}

/// Every statement needed to create a table: the table, its indexes, and in
/// trigger mode the integrity triggers.
pub fn table_statements(
    registry: &SchemaRegistry,
    schema: &TableSchema,
    mapper: &dyn TypeMapper,
    mode: ForeignKeyMode,
) -> Result<Vec<String>> {
    let mut statements = vec![create_table(&CreateTable::from_schema(
        registry, schema, mapper,
    )?)];
    statements.extend(
        schema
            .indexes()
            .map(|index| create_index(&CreateIndex::from_index(&schema.table_name, index))),
    );
    if mode == ForeignKeyMode::Triggers {
        statements.extend(triggers(registry, schema)?);
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, LogicalType, Relationship, SqliteTypeMapper};

    fn column(name: &str, sql_type: &str) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            default_value: None,
            check: None,
        }
    }

    #[test]
    fn test_create_table_template() {
        let spec = CreateTable {
            table: "LIQUOR".into(),
            columns: vec![
                ColumnDef {
                    not_null: true,
                    ..column("ID", "INTEGER")
                },
                ColumnDef {
                    default_value: Some("n/a".into()),
                    check: Some("length(NAME) > 0".into()),
                    ..column("NAME", "TEXT")
                },
            ],
            primary_keys: vec!["ID".into()],
            unique_columns: vec!["NAME".into()],
            foreign_keys: String::new(),
        };

        assert_eq!(
            create_table(&spec),
            "CREATE TABLE IF NOT EXISTS LIQUOR (ID INTEGER NOT NULL, \
             NAME TEXT DEFAULT 'n/a' CHECK(length(NAME) > 0), PRIMARY KEY(ID), UNIQUE(NAME))"
        );
    }

    #[test]
    fn test_create_table_without_keys() {
        let spec = CreateTable {
            table: "LOG".into(),
            columns: vec![column("LINE", "TEXT")],
            ..Default::default()
        };
        assert_eq!(create_table(&spec), "CREATE TABLE IF NOT EXISTS LOG (LINE TEXT)");
    }

    #[test]
    fn test_index_templates() {
        let index = Index::new("LIQUOR_IDX")
            .with_column("NAME")
            .with_column("ID")
            .with_unique();
        assert_eq!(
            create_index(&CreateIndex::from_index("LIQUOR", &index)),
            "CREATE UNIQUE INDEX IF NOT EXISTS LIQUOR_IDX ON LIQUOR(NAME, ID)"
        );
        assert_eq!(drop_index("LIQUOR_IDX"), "DROP INDEX IF EXISTS LIQUOR_IDX");
        assert_eq!(drop_table("LIQUOR"), "DROP TABLE IF EXISTS LIQUOR");
    }

    #[test]
    fn test_introspection_templates() {
        assert_eq!(table_info("Liquor"), "PRAGMA table_info(Liquor)");
        assert_eq!(fetch_version(), "PRAGMA user_version;");
        assert_eq!(set_version(2), "PRAGMA user_version=2");
        assert_eq!(list_tables(), "SELECT * FROM sqlite_master WHERE type='table'");
        assert_eq!(
            alter_add_column("Liquor", "notes"),
            "ALTER TABLE Liquor ADD COLUMN notes TEXT"
        );
        assert_eq!(foreign_keys_pragma(true), "PRAGMA foreign_keys=ON");
    }

    #[test]
    fn test_from_schema_inherits_parent_keys() {
        let registry = SchemaRegistry::new();
        registry
            .register(
                TableSchema::new("BRAND", "Brand").with_column(
                    Column::new("id", "BRAND_ID", LogicalType::Integer)
                        .with_primary_key()
                        .with_not_null(),
                ),
            )
            .unwrap();
        let liquor = registry
            .register(
                TableSchema::new("LIQUOR", "Liquor")
                    .with_column(Column::new("id", "ID", LogicalType::Integer).with_primary_key())
                    .with_column(Column::new("name", "NAME", LogicalType::String).with_unique())
                    .with_index(Index::new("LIQUOR_NAME_IDX").with_column("NAME"))
                    .with_relationship(Relationship::many_to_one("brand", "Brand")),
            )
            .unwrap();

        let statements =
            table_statements(&registry, &liquor, &SqliteTypeMapper, ForeignKeyMode::Native)
                .unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE IF NOT EXISTS LIQUOR (ID INTEGER, NAME TEXT, BRAND_ID INTEGER NOT NULL, \
                 PRIMARY KEY(ID, BRAND_ID), UNIQUE(NAME), \
                 FOREIGN KEY(BRAND_ID) REFERENCES BRAND(BRAND_ID))"
                    .to_string(),
                "CREATE INDEX IF NOT EXISTS LIQUOR_NAME_IDX ON LIQUOR(NAME)".to_string(),
            ]
        );
    }
}
