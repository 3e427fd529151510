//! Query Builder WHERE clause operations

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::Value;

impl QueryBuilder {
    fn push_where(
        mut self,
        column: &str,
        operator: QueryOperator,
        value: Option<Value>,
        values: Vec<Value>,
        boolean: WhereBoolean,
    ) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator,
            value,
            values,
            boolean,
            subquery: None,
            nested: Vec::new(),
        });
        self
    }

    fn push_where_sub(mut self, column: &str, operator: QueryOperator, subquery: QueryBuilder, boolean: WhereBoolean) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator,
            value: None,
            values: Vec::new(),
            boolean,
            subquery: Some(Box::new(subquery)),
            nested: Vec::new(),
        });
        self
    }

    fn push_nested<F>(mut self, boolean: WhereBoolean, callback: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let group = callback(QueryBuilder::new());
        if group.where_conditions.is_empty() {
            return self;
        }
        self.where_conditions.push(WhereCondition {
            column: String::new(),
            operator: QueryOperator::Nested,
            value: None,
            values: Vec::new(),
            boolean,
            subquery: None,
            nested: group.where_conditions,
        });
        self
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T>(self, column: &str, value: T) -> Self
    where
        T: Into<Value>,
    {
        self.push_where(column, QueryOperator::Equal, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add OR WHERE condition with equality
    pub fn or_where_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_where(column, QueryOperator::Equal, Some(value.into()), Vec::new(), WhereBoolean::Or)
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_where(column, QueryOperator::NotEqual, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_where(column, QueryOperator::GreaterThan, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_where(column, QueryOperator::GreaterThanOrEqual, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_where(column, QueryOperator::LessThan, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push_where(column, QueryOperator::LessThanOrEqual, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.push_where(column, QueryOperator::Like, Some(Value::from(pattern)), Vec::new(), WhereBoolean::And)
    }

    /// Add WHERE condition with a string operator such as `">="` or `"like"`
    pub fn where_op<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> Self {
        let query_operator = QueryOperator::parse(operator).unwrap_or_else(|| {
            tracing::warn!("Unknown where operator '{}', falling back to '='", operator);
            QueryOperator::Equal
        });
        self.push_where(column, query_operator, Some(value.into()), Vec::new(), WhereBoolean::And)
    }

    /// Add OR WHERE condition with a string operator
    pub fn or_where_op<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> Self {
        let query_operator = QueryOperator::parse(operator).unwrap_or_else(|| {
            tracing::warn!("Unknown where operator '{}', falling back to '='", operator);
            QueryOperator::Equal
        });
        self.push_where(column, query_operator, Some(value.into()), Vec::new(), WhereBoolean::Or)
    }

    /// Add WHERE conditions for every `(column, value)` pair, joined with AND
    pub fn where_all<I, K, V>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in conditions {
            self = self.where_eq(column.as_ref(), value);
        }
        self
    }

    /// Add WHERE condition with IN
    pub fn where_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(|v| v.into()).collect();
        self.push_where(column, QueryOperator::In, None, values, WhereBoolean::And)
    }

    /// Add OR WHERE condition with IN
    pub fn or_where_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(|v| v.into()).collect();
        self.push_where(column, QueryOperator::In, None, values, WhereBoolean::Or)
    }

    /// Add WHERE condition with NOT IN
    pub fn where_not_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(|v| v.into()).collect();
        self.push_where(column, QueryOperator::NotIn, None, values, WhereBoolean::And)
    }

    /// Add WHERE condition with `IN (SELECT ...)`
    pub fn where_in_sub(self, column: &str, subquery: QueryBuilder) -> Self {
        self.push_where_sub(column, QueryOperator::In, subquery, WhereBoolean::And)
    }

    /// Add OR WHERE condition with `IN (SELECT ...)`
    pub fn or_where_in_sub(self, column: &str, subquery: QueryBuilder) -> Self {
        self.push_where_sub(column, QueryOperator::In, subquery, WhereBoolean::Or)
    }

    /// Add WHERE condition with `NOT IN (SELECT ...)`
    pub fn where_not_in_sub(self, column: &str, subquery: QueryBuilder) -> Self {
        self.push_where_sub(column, QueryOperator::NotIn, subquery, WhereBoolean::And)
    }

    /// Add OR WHERE condition with `NOT IN (SELECT ...)`
    pub fn or_where_not_in_sub(self, column: &str, subquery: QueryBuilder) -> Self {
        self.push_where_sub(column, QueryOperator::NotIn, subquery, WhereBoolean::Or)
    }

    /// Add a parenthesized group of conditions built by `callback`.
    ///
    /// An empty group adds nothing.
    pub fn where_nested<F>(self, callback: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        self.push_nested(WhereBoolean::And, callback)
    }

    /// OR variant of [`QueryBuilder::where_nested`]
    pub fn or_where_nested<F>(self, callback: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        self.push_nested(WhereBoolean::Or, callback)
    }

    /// Move an OR chain into one AND group, so later ANDs bind to all of it
    pub(crate) fn wrap_wheres(mut self) -> Self {
        if !self
            .where_conditions
            .iter()
            .any(|condition| condition.boolean == WhereBoolean::Or)
        {
            return self;
        }
        let nested = std::mem::take(&mut self.where_conditions);
        self.where_conditions.push(WhereCondition {
            column: String::new(),
            operator: QueryOperator::Nested,
            value: None,
            values: Vec::new(),
            boolean: WhereBoolean::And,
            subquery: None,
            nested,
        });
        self
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(self, column: &str) -> Self {
        self.push_where(column, QueryOperator::IsNull, None, Vec::new(), WhereBoolean::And)
    }

    /// Add OR WHERE condition with IS NULL
    pub fn or_where_null(self, column: &str) -> Self {
        self.push_where(column, QueryOperator::IsNull, None, Vec::new(), WhereBoolean::Or)
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_where(column, QueryOperator::IsNotNull, None, Vec::new(), WhereBoolean::And)
    }
}
