//! Index definitions.

use serde::{Deserialize, Serialize};

/// A named index over an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name, unique within its table.
    pub name: String,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// Column names; order matters for composite indexes.
    pub columns: Vec<String>,
}

impl Index {
    /// Create a non-unique index with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            columns: Vec::new(),
        }
    }

    /// Append a column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Mark as unique.
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
