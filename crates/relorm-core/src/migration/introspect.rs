//! Live schema introspection.

use super::error::MigrationError;
use crate::error::Result;
use crate::executor::StorageExecutor;
use crate::query::{fetch_version, list_tables, table_info};
use crate::value::Value;

/// A table as it exists in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTable {
    /// Table name.
    pub name: String,
    /// Column names in storage order.
    pub columns: Vec<String>,
}

impl LiveTable {
    /// Whether the table has a column, ignoring case.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Stored version and tables of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSchema {
    /// Stored schema version.
    pub version: i64,
    /// Tables in storage, bookkeeping tables included.
    pub tables: Vec<LiveTable>,
}

impl LiveSchema {
    /// Read the stored version; a database that never stored one is at 0.
    pub fn version(executor: &dyn StorageExecutor) -> Result<i64> {
        let rows = executor.execute_query(&fetch_version())?;
        match rows.first().and_then(|row| row.first()) {
            None | Some(Value::Null) => Ok(0),
            Some(value) => value.as_i64().ok_or_else(|| {
                MigrationError::InvalidVersion {
                    found: value.to_string(),
                }
                .into()
            }),
        }
    }

    /// Read the stored version, every table and every table's columns.
    pub fn read(executor: &dyn StorageExecutor) -> Result<Self> {
        let version = Self::version(executor)?;
        let mut tables = Vec::new();
        for row in executor.execute_query(&list_tables())? {
            let Some(name) = row.get("name").and_then(Value::as_str) else {
                continue;
            };
            let columns = executor
                .execute_query(&table_info(name))?
                .iter()
                .filter_map(|info| info.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect();
            tables.push(LiveTable {
                name: name.to_string(),
                columns,
            });
        }
        Ok(Self { version, tables })
    }

    /// Look up a table, ignoring case.
    pub fn table(&self, name: &str) -> Option<&LiveTable> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}
