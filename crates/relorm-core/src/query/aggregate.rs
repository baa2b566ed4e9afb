//! Single-column aggregate queries.

use super::dml::{check_having, non_empty};
use crate::error::{Error, Result};
use crate::value::quote_literal;
use serde::{Deserialize, Serialize};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Row or non-null value count.
    Count,
    /// Average of non-null values.
    Avg,
    /// Sum; NULL over an empty set.
    Sum,
    /// Floating-point sum; 0.0 over an empty set.
    Total,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Concatenation of non-null values.
    GroupConcat,
}

impl AggregateFunction {
    /// SQL function name.
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Total => "TOTAL",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::GroupConcat => "GROUP_CONCAT",
        }
    }
}

/// Options of an aggregate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Aggregate function.
    pub function: AggregateFunction,
    /// Table to read.
    pub table: String,
    /// Aggregated column; COUNT without a column counts rows.
    pub column: Option<String>,
    /// Aggregate distinct values only.
    pub distinct: bool,
    /// WHERE condition.
    pub where_clause: Option<String>,
    /// GROUP BY columns.
    pub group_by: Vec<String>,
    /// HAVING condition; requires `group_by`.
    pub having: Option<String>,
    /// GROUP_CONCAT separator.
    pub delimiter: Option<String>,
}

impl Aggregate {
    /// An aggregate over `column` with no filters.
    pub fn new(
        function: AggregateFunction,
        table: impl Into<String>,
        column: Option<String>,
    ) -> Self {
        Self {
            function,
            table: table.into(),
            column,
            distinct: false,
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            delimiter: None,
        }
    }

    /// `COUNT(*)` over a table.
    pub fn count(table: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Count, table, None)
    }

    /// An aggregate of `function` over one column.
    pub fn of(
        function: AggregateFunction,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::new(function, table, Some(column.into()))
    }

    /// Set the WHERE condition.
    pub fn with_where(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }
}

/// Render an aggregate query.
pub fn aggregate(spec: &Aggregate) -> Result<String> {
    check_having(&spec.having, &spec.group_by)?;

    let column = spec.column.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let argument = match (spec.function, column) {
        (AggregateFunction::Count, None) => "*".to_string(),
        (_, Some(column)) => {
            let mut argument = String::new();
            if spec.distinct {
                argument.push_str("DISTINCT ");
            }
            argument.push_str(column);
            if spec.function == AggregateFunction::GroupConcat {
                if let Some(delimiter) = &spec.delimiter {
                    if spec.distinct {
                        return Err(Error::Builder(
                            "GROUP_CONCAT(DISTINCT ...) does not accept a delimiter".to_string(),
                        ));
                    }
                    argument.push_str(", ");
                    argument.push_str(&quote_literal(delimiter));
                }
            }
            argument
        }
        (function, None) => {
            return Err(Error::Builder(format!(
                "{} requires a column",
                function.as_sql()
            )))
        }
    };

    let mut sql = format!(
        "SELECT {}({}) FROM {}",
        spec.function.as_sql(),
        argument,
        spec.table
    );
    if let Some(condition) = non_empty(&spec.where_clause) {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    if !spec.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&spec.group_by.join(", "));
    }
    if let Some(having) = non_empty(&spec.having) {
        sql.push_str(" HAVING ");
        sql.push_str(having);
    }
    Ok(sql)
}
