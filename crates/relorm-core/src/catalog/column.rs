//! Column definitions for tables.

use super::types::LogicalType;
use serde::{Deserialize, Serialize};

/// A column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Field name on the mapped type, used to find the accessor.
    pub variable_name: String,
    /// Column name in the table.
    pub column_name: String,
    /// Logical type, mapped to a storage type at DDL time.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Part of the table's (composite) primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Rejects NULL.
    #[serde(default)]
    pub not_null: bool,
    /// Part of the table's composite unique constraint.
    #[serde(default)]
    pub unique: bool,
    /// Default value, rendered as a quoted literal.
    #[serde(default)]
    pub default_value: Option<String>,
    /// CHECK expression.
    #[serde(default)]
    pub check: Option<String>,
}

impl Column {
    /// Create a nullable column with no constraints.
    pub fn new(
        variable_name: impl Into<String>,
        column_name: impl Into<String>,
        logical_type: LogicalType,
    ) -> Self {
        Self {
            variable_name: variable_name.into(),
            column_name: column_name.into(),
            logical_type,
            primary_key: false,
            not_null: false,
            unique: false,
            default_value: None,
            check: None,
        }
    }

    /// Mark as part of the primary key.
    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as NOT NULL.
    pub fn with_not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark as unique.
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the CHECK expression.
    pub fn with_check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self
    }

    /// Copy of this column as carried by a child table through an ownership edge.
    ///
    /// Primary key and nullability survive; uniqueness does not, since many
    /// children share one parent key.
    pub fn inherited(&self) -> Self {
        Self {
            unique: false,
            default_value: None,
            check: None,
            ..self.clone()
        }
    }
}
