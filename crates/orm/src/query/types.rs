//! Query Builder Types - Core types and enums for query building

use std::fmt;

use super::builder::QueryBuilder;
use crate::backends::Value;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    /// Parenthesized group held in [`WhereCondition::nested`]
    Nested,
}

impl QueryOperator {
    /// Parse an operator string as accepted by `where_op`
    pub fn parse(operator: &str) -> Option<Self> {
        match operator.trim().to_uppercase().as_str() {
            "=" | "==" => Some(QueryOperator::Equal),
            "!=" | "<>" => Some(QueryOperator::NotEqual),
            ">" => Some(QueryOperator::GreaterThan),
            ">=" => Some(QueryOperator::GreaterThanOrEqual),
            "<" => Some(QueryOperator::LessThan),
            "<=" => Some(QueryOperator::LessThanOrEqual),
            "LIKE" => Some(QueryOperator::Like),
            "NOT LIKE" => Some(QueryOperator::NotLike),
            _ => None,
        }
    }

    /// The comparison that holds exactly when `self` does not
    pub fn negate(&self) -> Self {
        match self {
            QueryOperator::Equal => QueryOperator::NotEqual,
            QueryOperator::NotEqual => QueryOperator::Equal,
            QueryOperator::GreaterThan => QueryOperator::LessThanOrEqual,
            QueryOperator::GreaterThanOrEqual => QueryOperator::LessThan,
            QueryOperator::LessThan => QueryOperator::GreaterThanOrEqual,
            QueryOperator::LessThanOrEqual => QueryOperator::GreaterThan,
            QueryOperator::Like => QueryOperator::NotLike,
            QueryOperator::NotLike => QueryOperator::Like,
            QueryOperator::In => QueryOperator::NotIn,
            QueryOperator::NotIn => QueryOperator::In,
            QueryOperator::IsNull => QueryOperator::IsNotNull,
            QueryOperator::IsNotNull => QueryOperator::IsNull,
            QueryOperator::Nested => QueryOperator::Nested,
        }
    }

    /// Evaluate a numeric comparison, `false` for non comparison operators
    pub fn compare_counts(&self, left: i64, right: i64) -> bool {
        match self {
            QueryOperator::Equal => left == right,
            QueryOperator::NotEqual => left != right,
            QueryOperator::GreaterThan => left > right,
            QueryOperator::GreaterThanOrEqual => left >= right,
            QueryOperator::LessThan => left < right,
            QueryOperator::LessThanOrEqual => left <= right,
            _ => false,
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
            QueryOperator::Nested => write!(f, "NESTED"),
        }
    }
}

/// How a condition joins the conditions before it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WhereBoolean {
    And,
    Or,
}

impl fmt::Display for WhereBoolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereBoolean::And => write!(f, "AND"),
            WhereBoolean::Or => write!(f, "OR"),
        }
    }
}

/// Where clause condition
#[derive(Debug, Clone, PartialEq)]
pub struct WhereCondition {
    pub column: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN, NOT IN
    pub boolean: WhereBoolean,
    /// `IN (SELECT ...)` source, replaces `values` when set
    pub subquery: Option<Box<QueryBuilder>>,
    pub nested: Vec<WhereCondition>,
}

/// Join types
#[derive(Debug, Clone, PartialEq)]
pub enum JoinType {
    Inner,
    Left,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
        }
    }
}

/// Join clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub on_conditions: Vec<(String, String)>, // (left_column, right_column)
}

/// Order by direction
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// A select list entry split into its column and optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub column: String,
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Parse `"table.column as alias"` (case insensitive `as`)
    pub fn parse(expression: &str) -> Self {
        let trimmed = expression.trim();
        let lower = trimmed.to_lowercase();

        match lower.find(" as ") {
            Some(index) => SelectColumn {
                column: trimmed[..index].trim().to_string(),
                alias: Some(trimmed[index + 4..].trim().to_string()),
            },
            None => SelectColumn {
                column: trimmed.to_string(),
                alias: None,
            },
        }
    }

    /// The name the column has in the result row
    pub fn output_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => unqualified(&self.column),
        }
    }
}

/// Strip a `table.` prefix from a column reference
pub fn unqualified(column: &str) -> &str {
    match column.rfind('.') {
        Some(index) => &column[index + 1..],
        None => column,
    }
}

/// Prefix `column` with `table.` unless it is already qualified
pub fn qualify(table: &str, column: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", table, column)
    }
}
