//! Database descriptors and JSON schema documents.

use super::registry::SchemaRegistry;
use super::table::TableSchema;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A database: its name, declared schema version, location and member types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Database name.
    pub name: String,
    /// Declared schema version, compared against the stored version on upgrade.
    #[serde(default)]
    pub version: i64,
    /// File location; `None` means an in-memory database.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Ask the storage engine for thread-safe locking.
    #[serde(default)]
    pub locking_required: bool,
    /// Mapped type names of the tables in this database, in declaration order.
    #[serde(default)]
    pub tables: Vec<String>,
}

impl DatabaseDescriptor {
    /// Create a descriptor at version 1 with no tables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            path: None,
            locking_required: false,
            tables: Vec::new(),
        }
    }

    /// Set the declared version.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Set the file location.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Request thread-safe locking.
    pub fn with_locking(mut self, required: bool) -> Self {
        self.locking_required = required;
        self
    }

    /// Add a member type.
    pub fn with_table(mut self, mapped_type: impl Into<String>) -> Self {
        let mapped_type = mapped_type.into();
        if !self.tables.contains(&mapped_type) {
            self.tables.push(mapped_type);
        }
        self
    }

    /// Whether a mapped type belongs to this database.
    pub fn contains(&self, mapped_type: &str) -> bool {
        self.tables.iter().any(|t| t == mapped_type)
    }
}

/// A database descriptor together with its table schemas, as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// The database.
    pub database: DatabaseDescriptor,
    /// Table schemas.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl SchemaDocument {
    /// Decode a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Register every table and return the descriptor, extended with any
    /// table the document declares but the descriptor does not list.
    pub fn register(self, registry: &SchemaRegistry) -> Result<DatabaseDescriptor> {
        let mut database = self.database;
        for table in self.tables {
            let schema = registry.register(table)?;
            database = database.with_table(schema.mapped_type_name.clone());
        }
        Ok(database)
    }
}
