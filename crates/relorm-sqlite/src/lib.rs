//! SQLite storage executor for relorm.
//!
//! [`SqliteExecutor`] owns one `rusqlite` connection behind a mutex and
//! implements [`StorageExecutor`], so a [`relorm_core::Database`] can run
//! against a file or an in-memory database.
//!
//! ```ignore
//! let executor = Arc::new(SqliteExecutor::new());
//! let database = Database::new(descriptor, registry, executor);
//! database.open()?;
//! database.upgrade()?;
//! ```

use parking_lot::Mutex;
use relorm_core::{DatabaseDescriptor, Error, Result, Row, StorageExecutor, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use std::time::Duration;
use tracing::{debug, info};

/// Privileged method: toggle thread-safe locking. The connection is always
/// serialized by the executor, so this only records the request.
pub const SET_LOCKING_ENABLED: &str = "set_locking_enabled";
/// Privileged method: toggle native foreign-key enforcement.
pub const FOREIGN_KEYS: &str = "foreign_keys";
/// Privileged method: busy timeout in milliseconds.
pub const BUSY_TIMEOUT: &str = "busy_timeout";

/// A [`StorageExecutor`] over a single SQLite connection.
#[derive(Debug, Default)]
pub struct SqliteExecutor {
    connection: Mutex<Option<Connection>>,
    locking: Mutex<bool>,
}

impl SqliteExecutor {
    /// Create an executor with no open connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor over a fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().map_err(|e| Error::statement(":memory:", e))?;
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            locking: Mutex::new(false),
        })
    }

    /// Whether a connection is open.
    pub fn is_open(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Whether locking was last requested.
    pub fn locking_enabled(&self) -> bool {
        *self.locking.lock()
    }

    fn with_connection<R>(
        &self,
        sql: &str,
        f: impl FnOnce(&Connection) -> Result<R>,
    ) -> Result<R> {
        let guard = self.connection.lock();
        match guard.as_ref() {
            Some(connection) => f(connection),
            None => Err(Error::statement(sql, "database is not open")),
        }
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

impl StorageExecutor for SqliteExecutor {
    fn open_or_create(&self, descriptor: &DatabaseDescriptor) -> Result<()> {
        let mut guard = self.connection.lock();
        if guard.is_some() {
            debug!(database = %descriptor.name, "connection already open");
            return Ok(());
        }
        let connection = match &descriptor.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::statement(path.display().to_string(), e))?;
                }
                Connection::open(path)
                    .map_err(|e| Error::statement(path.display().to_string(), e))?
            }
            None => Connection::open_in_memory().map_err(|e| Error::statement(":memory:", e))?,
        };
        info!(
            database = %descriptor.name,
            path = ?descriptor.path,
            "sqlite connection opened"
        );
        *guard = Some(connection);
        Ok(())
    }

    fn close(&self, descriptor: &DatabaseDescriptor) -> Result<()> {
        let Some(connection) = self.connection.lock().take() else {
            return Ok(());
        };
        connection
            .close()
            .map_err(|(_, e)| Error::statement("close", e))?;
        info!(database = %descriptor.name, "sqlite connection closed");
        Ok(())
    }

    fn execute(&self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "execute");
        self.with_connection(sql, |connection| {
            connection
                .execute_batch(sql)
                .map_err(|e| Error::statement(sql, e))
        })
    }

    fn execute_bound(&self, sql: &str, params: &[Value]) -> Result<()> {
        debug!(sql = %sql, params = params.len(), "execute bound");
        self.with_connection(sql, |connection| {
            let mut statement = connection
                .prepare(sql)
                .map_err(|e| Error::statement(sql, e))?;
            let expected = statement.parameter_count();
            if expected != params.len() {
                return Err(Error::statement(
                    sql,
                    format!("expected {} parameters, got {}", expected, params.len()),
                ));
            }
            for (i, value) in params.iter().enumerate() {
                statement
                    .raw_bind_parameter(i + 1, to_sql(value))
                    .map_err(|e| Error::Bind {
                        sql: sql.to_string(),
                        index: i + 1,
                        value: value.clone(),
                        message: e.to_string(),
                    })?;
            }
            statement
                .raw_execute()
                .map(|_| ())
                .map_err(|e| Error::statement(sql, e))
        })
    }

    fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql = %sql, "query");
        self.with_connection(sql, |connection| {
            let mut statement = connection
                .prepare(sql)
                .map_err(|e| Error::statement(sql, e))?;
            let names: Vec<String> = statement
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let mut rows = statement.query([]).map_err(|e| Error::statement(sql, e))?;

            let mut result = Vec::new();
            while let Some(row) = rows.next().map_err(|e| Error::statement(sql, e))? {
                let mut out = Row::new();
                for (i, name) in names.iter().enumerate() {
                    let value = row.get_ref(i).map_err(|e| Error::statement(sql, e))?;
                    out.push(name.clone(), from_sql(value));
                }
                result.push(out);
            }
            Ok(result)
        })
    }

    fn execute_privileged_method(&self, name: &str, argument: Option<&Value>) -> Result<()> {
        let enabled = argument.and_then(Value::as_bool).unwrap_or(true);
        match name {
            SET_LOCKING_ENABLED => {
                *self.locking.lock() = enabled;
                debug!(enabled, "locking requested");
                Ok(())
            }
            FOREIGN_KEYS => {
                let sql = format!("PRAGMA foreign_keys={}", if enabled { "ON" } else { "OFF" });
                self.execute(&sql)
            }
            BUSY_TIMEOUT => {
                let millis = argument.and_then(Value::as_i64).unwrap_or(0).max(0) as u64;
                self.with_connection(name, |connection| {
                    connection
                        .busy_timeout(Duration::from_millis(millis))
                        .map_err(|e| Error::statement(name, e))
                })
            }
            other => Err(Error::statement(
                other,
                format!("unknown privileged method `{}`", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_executor_rejects_statements() {
        let executor = SqliteExecutor::new();
        assert!(!executor.is_open());
        let err = executor.execute("SELECT 1").unwrap_err();
        assert_eq!(err.sql(), Some("SELECT 1"));
    }

    #[test]
    fn test_bound_insert_and_query() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor
            .execute("CREATE TABLE T (A INTEGER, B TEXT, C REAL, D BLOB)")
            .unwrap();
        executor
            .execute_bound(
                "INSERT INTO T(A, B, C, D) VALUES(?, ?, ?, ?)",
                &[
                    Value::Integer(3),
                    Value::Text("gin".into()),
                    Value::Real(1.5),
                    Value::Blob(vec![1, 2]),
                ],
            )
            .unwrap();

        let rows = executor.execute_query("SELECT * FROM T").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("A"), Some(&Value::Integer(3)));
        assert_eq!(rows[0].get("b"), Some(&Value::Text("gin".into())));
        assert_eq!(rows[0].get("C"), Some(&Value::Real(1.5)));
        assert_eq!(rows[0].get("D"), Some(&Value::Blob(vec![1, 2])));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.execute("CREATE TABLE T (A INTEGER)").unwrap();
        let err = executor
            .execute_bound("INSERT INTO T(A) VALUES(?)", &[])
            .unwrap_err();
        assert!(err.to_string().contains("expected 1 parameters"));
    }

    #[test]
    fn test_privileged_methods() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor
            .execute_privileged_method(SET_LOCKING_ENABLED, Some(&Value::from(true)))
            .unwrap();
        assert!(executor.locking_enabled());

        executor
            .execute_privileged_method(FOREIGN_KEYS, Some(&Value::from(true)))
            .unwrap();
        let rows = executor.execute_query("PRAGMA foreign_keys").unwrap();
        assert_eq!(rows[0].first(), Some(&Value::Integer(1)));

        executor
            .execute_privileged_method(BUSY_TIMEOUT, Some(&Value::Integer(250)))
            .unwrap();
        assert!(executor.execute_privileged_method("vacuum_now", None).is_err());
    }

    #[test]
    fn test_user_version_reads_back() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.execute("PRAGMA user_version=3").unwrap();
        let rows = executor.execute_query("PRAGMA user_version;").unwrap();
        assert_eq!(rows[0].get("user_version"), Some(&Value::Integer(3)));
    }
}
