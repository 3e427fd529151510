//! Query Builder ORDER BY and GROUP BY operations

use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Order by `column` descending
    pub fn latest(self, column: &str) -> Self {
        self.order_by_desc(column)
    }

    /// Order by `column` ascending
    pub fn oldest(self, column: &str) -> Self {
        self.order_by(column)
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    /// Keep only groups whose row count satisfies `operator count`
    pub fn having_count(mut self, operator: QueryOperator, count: i64) -> Self {
        self.having_count = Some((operator, count));
        self
    }
}
