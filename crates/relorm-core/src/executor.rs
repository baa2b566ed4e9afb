//! Storage executor abstraction.
//!
//! The engine never talks to a database driver directly. Everything goes
//! through [`StorageExecutor`], which runs SQL text and returns rows as
//! ordered column/value pairs.

use crate::catalog::DatabaseDescriptor;
use crate::error::{Error, Result};
use crate::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One result row: column names mapped to values, in result order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Value of a column, matched exactly first and then case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.columns.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(_, v)| v)
    }

    /// First value of the row.
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, v)| v)
    }

    /// Column/value pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// Runs SQL against a concrete storage engine.
pub trait StorageExecutor: Send + Sync {
    /// Open the database described by `descriptor`, creating it if needed.
    fn open_or_create(&self, descriptor: &DatabaseDescriptor) -> Result<()>;

    /// Close the database.
    fn close(&self, descriptor: &DatabaseDescriptor) -> Result<()>;

    /// Execute a statement with no parameters.
    fn execute(&self, sql: &str) -> Result<()>;

    /// Execute a statement with positional parameters.
    fn execute_bound(&self, sql: &str, params: &[Value]) -> Result<()>;

    /// Run a query and return its rows.
    fn execute_query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Invoke an engine-specific operation outside plain SQL.
    fn execute_privileged_method(&self, name: &str, argument: Option<&Value>) -> Result<()>;
}

/// Executor that records every statement instead of running it.
///
/// Queries answer with rows scripted per exact SQL text, or no rows. Used
/// for dry-run migrations and for asserting generated SQL in tests.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    bound: Mutex<Vec<(String, Vec<Value>)>>,
    privileged: Mutex<Vec<(String, Option<Value>)>>,
    responses: Mutex<HashMap<String, Vec<Row>>>,
    failures: Mutex<HashMap<String, String>>,
}

impl RecordingExecutor {
    /// Create an executor with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `rows`.
    pub fn respond(&self, sql: impl Into<String>, rows: Vec<Row>) {
        self.responses.lock().insert(sql.into(), rows);
    }

    /// Make `sql` fail with `message`.
    pub fn fail_on(&self, sql: impl Into<String>, message: impl Into<String>) {
        self.failures.lock().insert(sql.into(), message.into());
    }

    /// Stop failing `sql`.
    pub fn succeed_on(&self, sql: &str) {
        self.failures.lock().remove(sql);
    }

    /// Every statement and query seen, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Bound statements with their parameters, in order.
    pub fn bound(&self) -> Vec<(String, Vec<Value>)> {
        self.bound.lock().clone()
    }

    /// Privileged method calls, in order.
    pub fn privileged(&self) -> Vec<(String, Option<Value>)> {
        self.privileged.lock().clone()
    }

    /// Forget recorded statements; scripted responses are kept.
    pub fn clear(&self) {
        self.statements.lock().clear();
        self.bound.lock().clear();
        self.privileged.lock().clear();
    }

    fn record(&self, sql: &str) -> Result<()> {
        self.statements.lock().push(sql.to_string());
        match self.failures.lock().get(sql) {
            Some(message) => Err(Error::statement(sql, message)),
            None => Ok(()),
        }
    }
}

impl StorageExecutor for RecordingExecutor {
    fn open_or_create(&self, _descriptor: &DatabaseDescriptor) -> Result<()> {
        Ok(())
    }

    fn close(&self, _descriptor: &DatabaseDescriptor) -> Result<()> {
        Ok(())
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.record(sql)
    }

    fn execute_bound(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.record(sql)?;
        self.bound.lock().push((sql.to_string(), params.to_vec()));
        Ok(())
    }

    fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.record(sql)?;
        Ok(self.responses.lock().get(sql).cloned().unwrap_or_default())
    }

    fn execute_privileged_method(&self, name: &str, argument: Option<&Value>) -> Result<()> {
        self.privileged
            .lock()
            .push((name.to_string(), argument.cloned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = Row::new()
            .with_column("ID", 1)
            .with_column("name", "Beer");
        assert_eq!(row.get("ID"), Some(&Value::Integer(1)));
        assert_eq!(row.get("NAME"), Some(&Value::Text("Beer".into())));
        assert_eq!(row.first(), Some(&Value::Integer(1)));
        assert!(row.get("missing").is_none());
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_from_iter() {
        let row: Row = vec![("a", Value::Integer(1)), ("b", Value::Null)]
            .into_iter()
            .collect();
        let names: Vec<&str> = row.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_recording() {
        let executor = RecordingExecutor::new();
        executor.respond("SELECT 1", vec![Row::new().with_column("1", 1)]);
        executor.fail_on("BROKEN", "syntax error");

        executor.execute("CREATE TABLE T (A)").unwrap();
        executor
            .execute_bound("INSERT INTO T(A) VALUES(?)", &[Value::Integer(3)])
            .unwrap();
        assert_eq!(executor.execute_query("SELECT 1").unwrap().len(), 1);
        assert!(executor.execute_query("SELECT 2").unwrap().is_empty());

        let err = executor.execute("BROKEN").unwrap_err();
        assert_eq!(err.sql(), Some("BROKEN"));

        assert_eq!(executor.statements().len(), 5);
        assert_eq!(executor.bound()[0].1, vec![Value::Integer(3)]);

        executor.clear();
        assert!(executor.statements().is_empty());
        assert_eq!(executor.execute_query("SELECT 1").unwrap().len(), 1);
    }
}
