//! Table schema: one mapped table/type pair.

use super::column::Column;
use super::index::Index;
use super::relation::{RelationKind, Relationship};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Schema of one mapped table.
///
/// Columns keep declaration order, which is also the order of column
/// definitions in DDL and of placeholders in insert/update statements.
/// Columns are reachable both by column name and by variable name; the two
/// lookup maps are rebuilt whenever a column is added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TableSchemaDef")]
pub struct TableSchema {
    /// Table name.
    pub table_name: String,
    /// Mapped type name.
    pub mapped_type_name: String,
    /// Path of the descriptor this schema was read from.
    pub source: Option<String>,
    columns: Vec<Column>,
    indexes: BTreeMap<String, Index>,
    relationships: Vec<Relationship>,
    #[serde(skip)]
    by_column: HashMap<String, usize>,
    #[serde(skip)]
    by_variable: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct TableSchemaDef {
    table_name: String,
    mapped_type_name: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(default)]
    indexes: BTreeMap<String, Index>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl TryFrom<TableSchemaDef> for TableSchema {
    type Error = Error;

    fn try_from(def: TableSchemaDef) -> Result<Self> {
        let mut schema = TableSchema::new(def.table_name, def.mapped_type_name);
        schema.source = def.source;
        for column in def.columns {
            schema = schema.with_column(column);
        }
        for (_, index) in def.indexes {
            schema = schema.with_index(index);
        }
        for relationship in def.relationships {
            schema = schema.with_relationship(relationship);
        }
        schema.validate()?;
        Ok(schema)
    }
}

impl TableSchema {
    /// Create an empty schema.
    pub fn new(table_name: impl Into<String>, mapped_type_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            mapped_type_name: mapped_type_name.into(),
            source: None,
            columns: Vec::new(),
            indexes: BTreeMap::new(),
            relationships: Vec::new(),
            by_column: HashMap::new(),
            by_variable: HashMap::new(),
        }
    }

    /// Record the descriptor path.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Append a column.
    pub fn with_column(mut self, column: Column) -> Self {
        let position = self.columns.len();
        self.by_column
            .entry(column.column_name.clone())
            .or_insert(position);
        self.by_variable
            .entry(column.variable_name.clone())
            .or_insert(position);
        self.columns.push(column);
        self
    }

    /// Add an index, replacing any index of the same name.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    /// Append a relationship.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Check mandatory fields and name uniqueness.
    pub fn validate(&self) -> Result<()> {
        let schema_name = if self.table_name.is_empty() {
            self.mapped_type_name.clone()
        } else {
            self.table_name.clone()
        };
        let missing = |field: &str| Error::MissingField {
            schema: schema_name.clone(),
            field: field.to_string(),
        };

        if self.table_name.trim().is_empty() {
            return Err(missing("table_name"));
        }
        if self.mapped_type_name.trim().is_empty() {
            return Err(missing("mapped_type_name"));
        }
        for column in &self.columns {
            if column.column_name.trim().is_empty() {
                return Err(missing("column_name"));
            }
            if column.variable_name.trim().is_empty() {
                return Err(missing("variable_name"));
            }
        }
        for (position, column) in self.columns.iter().enumerate() {
            if self.by_column.get(&column.column_name) != Some(&position) {
                return Err(Error::DuplicateColumn {
                    table: self.table_name.clone(),
                    name: column.column_name.clone(),
                });
            }
            if self.by_variable.get(&column.variable_name) != Some(&position) {
                return Err(Error::DuplicateColumn {
                    table: self.table_name.clone(),
                    name: column.variable_name.clone(),
                });
            }
        }
        for index in self.indexes.values() {
            if index.name.trim().is_empty() {
                return Err(missing("index name"));
            }
            if index.columns.is_empty() {
                return Err(missing(&format!("columns of index {}", index.name)));
            }
        }
        for relationship in &self.relationships {
            if relationship.refer.trim().is_empty() {
                return Err(missing("refer"));
            }
            if relationship.refer_to.trim().is_empty() {
                return Err(missing("refer_to"));
            }
        }
        Ok(())
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by column name, falling back to a case-insensitive match.
    pub fn column_by_name(&self, column_name: &str) -> Option<&Column> {
        match self.by_column.get(column_name) {
            Some(&position) => self.columns.get(position),
            None => self
                .columns
                .iter()
                .find(|c| c.column_name.eq_ignore_ascii_case(column_name)),
        }
    }

    /// Look up a column by variable name.
    pub fn column_by_variable(&self, variable_name: &str) -> Option<&Column> {
        self.by_variable
            .get(variable_name)
            .and_then(|&position| self.columns.get(position))
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_name.as_str()).collect()
    }

    /// Variable names in declaration order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.variable_name.as_str()).collect()
    }

    /// Declared primary-key columns.
    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Declared NOT NULL columns.
    pub fn mandatory_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.not_null)
    }

    /// Declared unique columns.
    pub fn unique_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.unique)
    }

    /// Indexes ordered by name.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// All relationships in declaration order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Look up a relationship by its local field.
    pub fn relationship_by_refer(&self, refer: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.refer == refer)
    }

    /// Relationships targeting a mapped type.
    pub fn relationships_by_refer_to<'a>(
        &'a self,
        refer_to: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> {
        self.relationships.iter().filter(move |r| r.refer_to == refer_to)
    }

    /// Relationships of one kind.
    pub fn relationships_of_kind(&self, kind: RelationKind) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.kind == kind)
    }

    /// Many-to-one and many-to-many relationships, whose targets own this table's rows.
    pub fn ownership_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(|r| r.kind.is_ownership())
    }

    /// One-to-one and one-to-many relationships.
    pub fn dependent_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(|r| r.kind.is_dependent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LogicalType;

    fn liquor() -> TableSchema {
        TableSchema::new("LIQUOR", "Liquor")
            .with_column(Column::new("id", "ID", LogicalType::Integer).with_primary_key())
            .with_column(Column::new("name", "NAME", LogicalType::String).with_not_null())
            .with_column(Column::new("code", "CODE", LogicalType::String).with_unique())
            .with_index(Index::new("LIQUOR_NAME_IDX").with_column("NAME"))
            .with_relationship(Relationship::many_to_one("brand", "Brand"))
            .with_relationship(Relationship::one_to_many("stocks", "Stock"))
    }

    #[test]
    fn test_dual_lookup() {
        let schema = liquor();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.column_by_name("NAME").unwrap().variable_name, "name");
        assert_eq!(schema.column_by_name("name").unwrap().column_name, "NAME");
        assert_eq!(schema.column_by_variable("id").unwrap().column_name, "ID");
        assert!(schema.column_by_variable("ID").is_none());
    }

    #[test]
    fn test_helper_accessors() {
        let schema = liquor();
        assert_eq!(schema.column_names(), vec!["ID", "NAME", "CODE"]);
        assert_eq!(schema.variable_names(), vec!["id", "name", "code"]);
        assert_eq!(schema.primary_keys().count(), 1);
        assert_eq!(schema.mandatory_columns().next().unwrap().column_name, "NAME");
        assert_eq!(schema.unique_columns().next().unwrap().column_name, "CODE");
        assert_eq!(schema.ownership_relationships().count(), 1);
        assert_eq!(schema.dependent_relationships().count(), 1);
        assert_eq!(schema.relationships_by_refer_to("Brand").count(), 1);
        assert!(schema.relationship_by_refer("stocks").is_some());
        assert!(schema.index("LIQUOR_NAME_IDX").is_some());
    }

    #[test]
    fn test_missing_table_name() {
        let err = TableSchema::new("", "Liquor").validate().unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "table_name"));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Liquor"));
    }

    #[test]
    fn test_duplicate_column() {
        let schema = TableSchema::new("T", "T")
            .with_column(Column::new("a", "A", LogicalType::Integer))
            .with_column(Column::new("b", "A", LogicalType::Integer));
        assert!(matches!(
            schema.validate(),
            Err(Error::DuplicateColumn { name, .. }) if name == "A"
        ));
    }

    #[test]
    fn test_deserialize_rebuilds_lookups() {
        let json = r#"{
            "table_name": "BRAND",
            "mapped_type_name": "Brand",
            "columns": [
                {"variable_name": "id", "column_name": "BRAND_ID", "type": "integer", "primary_key": true},
                {"variable_name": "name", "column_name": "NAME", "type": "string"}
            ],
            "relationships": [
                {"kind": "one_to_many", "refer": "liquors", "refer_to": "Liquor", "load": true}
            ]
        }"#;
        let schema: TableSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.column_by_variable("name").unwrap().column_name, "NAME");
        assert_eq!(schema.column_by_name("BRAND_ID").unwrap().variable_name, "id");
        assert!(schema.relationships()[0].load);
    }

    #[test]
    fn test_deserialize_rejects_empty_type() {
        let json = r#"{"table_name": "BRAND", "mapped_type_name": ""}"#;
        assert!(serde_json::from_str::<TableSchema>(json).is_err());
    }
}
