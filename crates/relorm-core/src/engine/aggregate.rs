//! Scalar aggregates over mapped tables.

use super::Database;
use crate::error::Result;
use crate::query::{aggregate, Aggregate, AggregateFunction, Where};
use crate::value::Value;
use std::any::Any;
use tracing::debug;

impl Database {
    /// Number of rows of `T` matching `query`.
    pub fn count<T: Any>(&self, query: &Where) -> Result<i64> {
        let schema = self.schema_of::<T>()?;
        self.count_rows(&query.to_aggregate(AggregateFunction::Count, &schema.table_name, None))
    }

    /// Number of non-null values of `column`.
    pub fn count_column<T: Any>(&self, column: &str, query: &Where) -> Result<i64> {
        Ok(self
            .scalar::<T>(AggregateFunction::Count, Some(column), query)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// Average of `column`; `None` over no values.
    pub fn avg<T: Any>(&self, column: &str, query: &Where) -> Result<Option<f64>> {
        Ok(self
            .scalar::<T>(AggregateFunction::Avg, Some(column), query)?
            .and_then(|v| v.as_f64()))
    }

    /// Sum of `column`; `None` over no values.
    pub fn sum<T: Any>(&self, column: &str, query: &Where) -> Result<Option<f64>> {
        Ok(self
            .scalar::<T>(AggregateFunction::Sum, Some(column), query)?
            .and_then(|v| v.as_f64()))
    }

    /// Floating-point sum of `column`; `0.0` over no values.
    pub fn total<T: Any>(&self, column: &str, query: &Where) -> Result<f64> {
        Ok(self
            .scalar::<T>(AggregateFunction::Total, Some(column), query)?
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0))
    }

    /// Smallest value of `column`.
    pub fn min<T: Any>(&self, column: &str, query: &Where) -> Result<Option<Value>> {
        self.scalar::<T>(AggregateFunction::Min, Some(column), query)
    }

    /// Largest value of `column`.
    pub fn max<T: Any>(&self, column: &str, query: &Where) -> Result<Option<Value>> {
        self.scalar::<T>(AggregateFunction::Max, Some(column), query)
    }

    /// Values of `column` joined by the query's delimiter, or `,`.
    pub fn group_concat<T: Any>(&self, column: &str, query: &Where) -> Result<Option<String>> {
        Ok(self
            .scalar::<T>(AggregateFunction::GroupConcat, Some(column), query)?
            .map(|v| match v {
                Value::Text(text) => text,
                other => other.to_string(),
            }))
    }

    fn scalar<T: Any>(
        &self,
        function: AggregateFunction,
        column: Option<&str>,
        query: &Where,
    ) -> Result<Option<Value>> {
        let schema = self.schema_of::<T>()?;
        self.first_value(&query.to_aggregate(function, &schema.table_name, column))
    }

    pub(super) fn count_rows(&self, spec: &Aggregate) -> Result<i64> {
        Ok(self
            .first_value(spec)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// First column of the first row, with NULL read as absent.
    fn first_value(&self, spec: &Aggregate) -> Result<Option<Value>> {
        let sql = aggregate(spec)?;
        debug!(sql = %sql, "aggregate");
        let rows = self.executor.execute_query(&sql)?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .filter(|v| !v.is_null())
            .cloned())
    }
}
