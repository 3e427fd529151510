//! Query Builder - Core builder implementation

use super::types::*;

/// Column oriented query builder.
///
/// Holds the structured parts of a query; drivers compile it through
/// [`super::QueryGrammar`] or, for the in-memory driver, evaluate it directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    pub(crate) select_fields: Vec<String>,
    pub(crate) from_table: Option<String>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having_count: Option<(QueryOperator, i64)>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
    pub(crate) distinct: bool,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query builder for `table`
    pub fn table(table: &str) -> Self {
        Self::new().from(table)
    }

    /// The FROM table
    pub fn get_from(&self) -> Option<&str> {
        self.from_table.as_deref()
    }

    /// Select list, empty means `*`
    pub fn get_columns(&self) -> &[String] {
        &self.select_fields
    }

    pub fn get_wheres(&self) -> &[WhereCondition] {
        &self.where_conditions
    }

    pub fn get_joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn get_groups(&self) -> &[String] {
        &self.group_by
    }

    /// `HAVING COUNT(*) <op> <n>` filter over the groups
    pub fn get_having_count(&self) -> Option<&(QueryOperator, i64)> {
        self.having_count.as_ref()
    }

    pub fn get_orders(&self) -> &[(String, OrderDirection)] {
        &self.order_by
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.limit_count
    }

    pub fn get_offset(&self) -> Option<i64> {
        self.offset_value
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Drop limit, offset and ordering, used for aggregates
    pub(crate) fn without_paging(mut self) -> Self {
        self.limit_count = None;
        self.offset_value = None;
        self.order_by.clear();
        self
    }
}
