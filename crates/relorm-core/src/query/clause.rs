//! Fluent WHERE-clause builder.

use super::aggregate::{Aggregate, AggregateFunction};
use super::dml::{OrderDirection, Select};
use crate::value::{quote_literal, Value};

/// A filter condition over columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Column equals value.
    Eq { column: String, value: Value },
    /// Column not equals value.
    Ne { column: String, value: Value },
    /// Column less than value.
    Lt { column: String, value: Value },
    /// Column less than or equal to value.
    Le { column: String, value: Value },
    /// Column greater than value.
    Gt { column: String, value: Value },
    /// Column greater than or equal to value.
    Ge { column: String, value: Value },
    /// Column within an inclusive range.
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    /// Column matches a LIKE pattern.
    Like { column: String, pattern: String },
    /// Column is in a set of values.
    In { column: String, values: Vec<Value> },
    /// Column is null.
    IsNull { column: String },
    /// Column is not null.
    IsNotNull { column: String },
    /// Caller-supplied SQL condition.
    Raw(String),
    /// All conditions hold.
    And(Vec<Clause>),
    /// At least one condition holds.
    Or(Vec<Clause>),
}

impl Clause {
    /// Create an equality condition.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal condition.
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Ne {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a less-than condition.
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Lt {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equal condition.
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Le {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than condition.
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Gt {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equal condition.
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Clause::Ge {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a BETWEEN condition.
    pub fn between(
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Clause::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Create a LIKE condition.
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Clause::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    /// Create an IN condition.
    pub fn in_values(column: impl Into<String>, values: Vec<Value>) -> Self {
        Clause::In {
            column: column.into(),
            values,
        }
    }

    /// Create an IS NULL condition.
    pub fn is_null(column: impl Into<String>) -> Self {
        Clause::IsNull {
            column: column.into(),
        }
    }

    /// Create an IS NOT NULL condition.
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Clause::IsNotNull {
            column: column.into(),
        }
    }

    /// Wrap raw SQL.
    pub fn raw(condition: impl Into<String>) -> Self {
        Clause::Raw(condition.into())
    }

    /// Combine with AND, flattening nested ANDs.
    pub fn and(self, other: Clause) -> Self {
        match self {
            Clause::And(mut clauses) => {
                clauses.push(other);
                Clause::And(clauses)
            }
            clause => Clause::And(vec![clause, other]),
        }
    }

    /// Combine with OR, flattening nested ORs.
    pub fn or(self, other: Clause) -> Self {
        match self {
            Clause::Or(mut clauses) => {
                clauses.push(other);
                Clause::Or(clauses)
            }
            clause => Clause::Or(vec![clause, other]),
        }
    }

    /// Render as SQL. Values are inlined as escaped literals.
    pub fn to_sql(&self) -> String {
        let compare = |column: &str, op: &str, value: &Value| {
            format!("{} {} {}", column, op, value.to_sql_literal())
        };
        match self {
            Clause::Eq { column, value } if value.is_null() => format!("{} IS NULL", column),
            Clause::Ne { column, value } if value.is_null() => format!("{} IS NOT NULL", column),
            Clause::Eq { column, value } => compare(column, "=", value),
            Clause::Ne { column, value } => compare(column, "!=", value),
            Clause::Lt { column, value } => compare(column, "<", value),
            Clause::Le { column, value } => compare(column, "<=", value),
            Clause::Gt { column, value } => compare(column, ">", value),
            Clause::Ge { column, value } => compare(column, ">=", value),
            Clause::Between { column, low, high } => format!(
                "{} BETWEEN {} AND {}",
                column,
                low.to_sql_literal(),
                high.to_sql_literal()
            ),
            Clause::Like { column, pattern } => {
                format!("{} LIKE {}", column, quote_literal(pattern))
            }
            Clause::In { column, values } => format!(
                "{} IN ({})",
                column,
                values
                    .iter()
                    .map(Value::to_sql_literal)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Clause::IsNull { column } => format!("{} IS NULL", column),
            Clause::IsNotNull { column } => format!("{} IS NOT NULL", column),
            Clause::Raw(condition) => condition.clone(),
            Clause::And(clauses) => join(clauses, " AND "),
            Clause::Or(clauses) => join(clauses, " OR "),
        }
    }
}

fn join(clauses: &[Clause], separator: &str) -> String {
    clauses
        .iter()
        .map(|clause| match clause {
            Clause::And(_) | Clause::Or(_) | Clause::Raw(_) if clauses.len() > 1 => {
                format!("({})", clause.to_sql())
            }
            _ => clause.to_sql(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Filter, projection, grouping, ordering and paging for a query on one table.
///
/// The table itself comes from the mapped type the query runs against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    filter: Option<Clause>,
    columns: Vec<String>,
    distinct: bool,
    group_by: Vec<String>,
    having: Option<String>,
    order_by: Vec<String>,
    direction: Option<OrderDirection>,
    limit: Option<String>,
    delimiter: Option<String>,
}

impl Where {
    /// Match every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a condition.
    pub fn filter(clause: Clause) -> Self {
        Self {
            filter: Some(clause),
            ..Self::default()
        }
    }

    /// Start from raw SQL.
    pub fn raw(condition: impl Into<String>) -> Self {
        Self::filter(Clause::raw(condition))
    }

    /// AND a condition onto the filter.
    pub fn and(mut self, clause: Clause) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(clause),
            None => clause,
        });
        self
    }

    /// OR a condition onto the filter.
    pub fn or(mut self, clause: Clause) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.or(clause),
            None => clause,
        });
        self
    }

    /// Project specific columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Emit DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Group by columns.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// HAVING condition.
    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.having = Some(condition.into());
        self
    }

    /// Order ascending by columns.
    pub fn order_by_asc<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by(columns, OrderDirection::Asc)
    }

    /// Order descending by columns.
    pub fn order_by_desc<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by(columns, OrderDirection::Desc)
    }

    /// Order by columns in a direction.
    pub fn order_by<I, S>(mut self, columns: I, direction: OrderDirection) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = columns.into_iter().map(Into::into).collect();
        self.direction = Some(direction);
        self
    }

    /// Return at most `count` rows.
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count.to_string());
        self
    }

    /// Skip `offset` rows, then return at most `count`.
    pub fn limit_offset(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some(format!("{}, {}", offset, count));
        self
    }

    /// GROUP_CONCAT separator.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Rendered filter condition, if any.
    pub fn condition(&self) -> Option<String> {
        self.filter.as_ref().map(Clause::to_sql)
    }

    /// SELECT options against `table`.
    pub fn to_select(&self, table: &str) -> Select {
        Select {
            table: table.to_string(),
            distinct: self.distinct,
            where_clause: self.condition(),
            columns: self.columns.clone(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            direction: self.direction,
            limit: self.limit.clone(),
        }
    }

    /// Aggregate options against `table`.
    pub fn to_aggregate(
        &self,
        function: AggregateFunction,
        table: &str,
        column: Option<&str>,
    ) -> Aggregate {
        Aggregate {
            function,
            table: table.to_string(),
            column: column.map(String::from),
            distinct: self.distinct,
            where_clause: self.condition(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            delimiter: self.delimiter.clone(),
        }
    }
}

impl From<Clause> for Where {
    fn from(clause: Clause) -> Self {
        Where::filter(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{aggregate, select};

    #[test]
    fn test_comparisons() {
        assert_eq!(Clause::eq("NAME", "Beer").to_sql(), "NAME = 'Beer'");
        assert_eq!(Clause::ne("ID", 1).to_sql(), "ID != 1");
        assert_eq!(Clause::ge("PRICE", 2.5).to_sql(), "PRICE >= 2.5");
        assert_eq!(Clause::between("ID", 1, 9).to_sql(), "ID BETWEEN 1 AND 9");
        assert_eq!(Clause::like("NAME", "B%").to_sql(), "NAME LIKE 'B%'");
        assert_eq!(
            Clause::in_values("ID", vec![Value::Integer(1), Value::Integer(2)]).to_sql(),
            "ID IN (1, 2)"
        );
        assert_eq!(Clause::is_null("NOTES").to_sql(), "NOTES IS NULL");
    }

    #[test]
    fn test_null_equality() {
        assert_eq!(Clause::eq("NOTES", Value::Null).to_sql(), "NOTES IS NULL");
        assert_eq!(Clause::ne("NOTES", None::<String>).to_sql(), "NOTES IS NOT NULL");
        assert_eq!(
            Clause::eq("ID", 1).and(Clause::eq("NOTES", None::<String>)).to_sql(),
            "ID = 1 AND NOTES IS NULL"
        );
    }

    #[test]
    fn test_nesting_parenthesizes() {
        let clause = Clause::eq("A", 1)
            .and(Clause::eq("B", 2))
            .or(Clause::eq("C", 3));
        assert_eq!(clause.to_sql(), "(A = 1 AND B = 2) OR C = 3");

        let flat = Clause::eq("A", 1).and(Clause::eq("B", 2)).and(Clause::eq("C", 3));
        assert_eq!(flat.to_sql(), "A = 1 AND B = 2 AND C = 3");
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(Clause::eq("NAME", "O'Neil").to_sql(), "NAME = 'O''Neil'");
    }

    #[test]
    fn test_where_to_select() {
        let query = Where::filter(Clause::eq("BRAND_ID", 9))
            .and(Clause::like("NAME", "B%"))
            .columns(["ID", "NAME"])
            .order_by_desc(["NAME"])
            .limit_offset(10, 5);
        assert_eq!(
            select(&query.to_select("LIQUOR")).unwrap(),
            "SELECT ID, NAME FROM LIQUOR WHERE BRAND_ID = 9 AND NAME LIKE 'B%' \
             ORDER BY NAME DESC LIMIT 10, 5"
        );
    }

    #[test]
    fn test_where_to_aggregate() {
        let query = Where::raw("PRICE > 1").group_by(["BRAND_ID"]).delimiter(",");
        let spec = query.to_aggregate(AggregateFunction::GroupConcat, "LIQUOR", Some("NAME"));
        assert_eq!(
            aggregate(&spec).unwrap(),
            "SELECT GROUP_CONCAT(NAME, ',') FROM LIQUOR WHERE PRICE > 1 GROUP BY BRAND_ID"
        );
    }

    #[test]
    fn test_empty_where() {
        assert!(Where::new().condition().is_none());
        assert_eq!(select(&Where::new().to_select("T")).unwrap(), "SELECT * FROM T");
    }
}
