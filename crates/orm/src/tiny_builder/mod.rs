//! TinyBuilder - the model aware query builder
//!
//! Wraps a [`QueryBuilder`] scoped to the model's table, hydrates rows into
//! models and resolves eager loads after fetching them.
//!
//! - `with`: eager load items and `with()` parsing
//! - `eager_loading`: batched relation loading through the visitor
//! - `execution`: fetching, hydrating and model returning CRUD helpers
//! - `soft_deletes`: the trashed scope of soft deleting models
//! - `existence`: `has()` / `where_has()` relationship existence queries

pub mod with;
pub mod eager_loading;
pub mod execution;
pub mod soft_deletes;
pub mod existence;

pub use with::{WithConstraint, WithItem};
pub use soft_deletes::TrashedScope;
pub use existence::HasConstraint;

use crate::backends::Value;
use crate::error::OrmResult;
use crate::model::Model;
use crate::query::QueryBuilder;

use with::add_with_item;

#[derive(Debug, Clone)]
pub struct TinyBuilder<M: Model> {
    query: QueryBuilder,
    model: M,
    eager_load: Vec<WithItem>,
    trashed: TrashedScope,
}

impl<M: Model> TinyBuilder<M> {
    /// Builder over the table of `model`, which is the template for hydrated
    /// instances
    pub fn new(model: M) -> Self {
        Self {
            query: QueryBuilder::table(M::table_name()),
            model,
            eager_load: Vec::new(),
            trashed: TrashedScope::default(),
        }
    }

    /// The wrapped query as built, without the trashed scope
    pub fn get_query(&self) -> &QueryBuilder {
        &self.query
    }

    pub fn get_model(&self) -> &M {
        &self.model
    }

    pub fn get_eager_loads(&self) -> &[WithItem] {
        &self.eager_load
    }

    /// Replace the eager load list
    pub fn set_eager_loads(&mut self, items: Vec<WithItem>) -> &mut Self {
        self.eager_load = items;
        self
    }

    /// Transform the wrapped query in place
    pub fn apply<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let query = std::mem::take(&mut self.query);
        self.query = f(query);
        self
    }

    fn map_query<F>(mut self, f: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        self.apply(f);
        self
    }

    /// Eager load `relations` with the results of this query.
    ///
    /// Accepts plain and dotted names, `"relation:col1,col2"` column lists
    /// and [`WithItem::constrained`] items.
    pub fn with<I, T>(mut self, relations: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<WithItem>,
    {
        for relation in relations {
            let item = relation.into().parse_columns()?;
            add_with_item(&mut self.eager_load, item);
        }
        Ok(self)
    }

    /// Default eager loads declared by the model, plain names only
    pub(crate) fn with_defaults(mut self, relations: &[&str]) -> Self {
        for relation in relations {
            add_with_item(&mut self.eager_load, WithItem::new(*relation));
        }
        self
    }

    /// Stop eager loading `relations`
    pub fn without(mut self, relations: &[&str]) -> Self {
        self.eager_load
            .retain(|item| !relations.contains(&item.name.as_str()));
        self
    }

    pub fn select(self, fields: &str) -> Self {
        self.map_query(|q| q.select(fields))
    }

    pub fn select_columns<S: AsRef<str>>(self, columns: &[S]) -> Self {
        self.map_query(|q| q.select_columns(columns))
    }

    pub fn add_select(self, fields: &str) -> Self {
        self.map_query(|q| q.add_select(fields))
    }

    pub fn distinct(self) -> Self {
        self.map_query(QueryBuilder::distinct)
    }

    pub fn where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.where_eq(column, value))
    }

    pub fn or_where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.or_where_eq(column, value))
    }

    pub fn where_ne<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.where_ne(column, value))
    }

    pub fn where_gt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.where_gt(column, value))
    }

    pub fn where_gte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.where_gte(column, value))
    }

    pub fn where_lt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.where_lt(column, value))
    }

    pub fn where_lte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.map_query(|q| q.where_lte(column, value))
    }

    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.map_query(|q| q.where_like(column, pattern))
    }

    pub fn where_op<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.map_query(|q| q.where_op(column, operator, value))
    }

    pub fn or_where_op<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.map_query(|q| q.or_where_op(column, operator, value))
    }

    /// AND every `(column, value)` equality
    pub fn where_all<I, K, V>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.map_query(|q| q.where_all(conditions))
    }

    pub fn where_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        self.map_query(|q| q.where_in(column, values))
    }

    pub fn or_where_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        self.map_query(|q| q.or_where_in(column, values))
    }

    pub fn where_not_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        self.map_query(|q| q.where_not_in(column, values))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.map_query(|q| q.where_null(column))
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.map_query(|q| q.or_where_null(column))
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.map_query(|q| q.where_not_null(column))
    }

    pub fn join(self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.map_query(|q| q.join(table, left_col, right_col))
    }

    pub fn left_join(self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.map_query(|q| q.left_join(table, left_col, right_col))
    }

    pub fn order_by(self, column: &str) -> Self {
        self.map_query(|q| q.order_by(column))
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.map_query(|q| q.order_by_desc(column))
    }

    /// Newest first by `column`, `created_at` by default
    pub fn latest(self, column: Option<&str>) -> Self {
        let column = column.unwrap_or(M::created_at_column()).to_string();
        self.map_query(|q| q.latest(&column))
    }

    pub fn oldest(self, column: Option<&str>) -> Self {
        let column = column.unwrap_or(M::created_at_column()).to_string();
        self.map_query(|q| q.oldest(&column))
    }

    pub fn limit(self, count: i64) -> Self {
        self.map_query(|q| q.limit(count))
    }

    pub fn take(self, count: i64) -> Self {
        self.limit(count)
    }

    pub fn offset(self, count: i64) -> Self {
        self.map_query(|q| q.offset(count))
    }

    pub fn skip(self, count: i64) -> Self {
        self.offset(count)
    }

    pub fn for_page(self, page: i64, per_page: i64) -> Self {
        self.map_query(|q| q.for_page(page, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::Post;
    use crate::model::Model;

    #[test]
    fn test_builder_targets_model_table() {
        let builder = Post::default().new_query();
        assert_eq!(builder.get_query().get_from(), Some("posts"));
        assert!(builder.get_eager_loads().is_empty());
    }

    #[test]
    fn test_with_and_without() {
        let builder = Post::default()
            .new_query()
            .with(["comments.post", "comments:id,post_id"])
            .unwrap();
        let names: Vec<&str> = builder.get_eager_loads().iter().map(WithItem::name).collect();
        assert_eq!(names, vec!["comments", "comments.post"]);
        assert_eq!(builder.get_eager_loads()[0].columns(), ["id", "post_id"]);

        let builder = builder.without(&["comments.post"]);
        assert_eq!(builder.get_eager_loads().len(), 1);
    }

    #[test]
    fn test_invalid_with_fails_immediately() {
        let result = Post::default().new_query().with(["comments:"]);
        assert!(matches!(
            result,
            Err(crate::error::ModelError::InvalidWithConstraint(_))
        ));
    }
}
