//! SELECT and parameterized INSERT/UPDATE/DELETE statements.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Options of a SELECT statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    /// Table to read.
    pub table: String,
    /// Emit DISTINCT.
    pub distinct: bool,
    /// WHERE condition without the keyword.
    pub where_clause: Option<String>,
    /// Projected columns; `*` when empty.
    pub columns: Vec<String>,
    /// GROUP BY columns.
    pub group_by: Vec<String>,
    /// HAVING condition; requires `group_by`.
    pub having: Option<String>,
    /// ORDER BY columns.
    pub order_by: Vec<String>,
    /// Direction applied to `order_by`.
    pub direction: Option<OrderDirection>,
    /// `<n>` or `<offset>,<n>`.
    pub limit: Option<String>,
}

impl Select {
    /// Select every column of a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set the WHERE condition.
    pub fn with_where(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    /// Set the limit.
    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

pub(crate) fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

pub(crate) fn check_having(having: &Option<String>, group_by: &[String]) -> Result<()> {
    if non_empty(having).is_some() && group_by.is_empty() {
        return Err(Error::Builder(
            "HAVING requires a GROUP BY clause".to_string(),
        ));
    }
    Ok(())
}

/// Whether `limit` has the form `\s*\d+\s*(,\s*\d+\s*)?`.
fn is_valid_limit(limit: &str) -> bool {
    let mut parts = limit.split(',');
    let is_number = |part: &str| {
        let part = part.trim();
        !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), None, None) => is_number(first),
        (Some(first), Some(second), None) => is_number(first) && is_number(second),
        _ => false,
    }
}

/// `SELECT ... FROM ...`, validating HAVING and LIMIT.
pub fn select(spec: &Select) -> Result<String> {
    check_having(&spec.having, &spec.group_by)?;

    let mut sql = String::from("SELECT ");
    if spec.distinct {
        sql.push_str("DISTINCT ");
    }
    if spec.columns.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&spec.columns.join(", "));
    }
    sql.push_str(" FROM ");
    sql.push_str(&spec.table);

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
    if !spec.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&spec.order_by.join(", "));
        if let Some(direction) = spec.direction {
            sql.push(' ');
            sql.push_str(direction.as_sql());
        }
    }
    if let Some(limit) = non_empty(&spec.limit) {
        if !is_valid_limit(limit) {
            return Err(Error::Builder(format!("invalid LIMIT `{}`", limit)));
        }
        sql.push_str(" LIMIT ");
        sql.push_str(limit);
    }
    Ok(sql)
}

/// `INSERT INTO t(c1, c2) VALUES(?, ?)`; values bind in column order.
pub fn insert_bind(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {}({}) VALUES({})",
        table,
        columns.join(", "),
        placeholders
    )
}

/// `UPDATE t SET c1 = ?, c2 = ?[ WHERE w]`; an empty condition updates every row.
pub fn update_bind(table: &str, columns: &[&str], condition: &str) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("UPDATE {} SET {}", table, assignments);
    if !condition.trim().is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

/// `DELETE FROM t[ WHERE w]`; an empty condition deletes every row.
pub fn delete(table: &str, condition: &str) -> String {
    let mut sql = format!("DELETE FROM {}", table);
    if !condition.trim().is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}
