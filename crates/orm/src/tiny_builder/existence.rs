//! Relationship existence queries - `has()`, `where_has()` and their
//! negations
//!
//! Each call visits the named relation with a querying store and receives a
//! `parent_key [NOT] IN (SELECT related_key ...)` clause. Counts other than
//! "at least one" group the subquery and compare `COUNT(*)`. Dotted names
//! nest: `has("torrentFiles.fileProperty", ">=", 2)` keeps torrents with a
//! file that has two properties.

use std::any::Any;

use super::TinyBuilder;
use crate::error::{ModelError, OrmResult};
use crate::model::Model;
use crate::query::{QueryOperator, WhereBoolean};
use crate::relationships::store::ExistenceRequest;
use crate::relationships::{visit_relation, RelationStore};

/// Callback constraining the related query of `where_has()`
pub type HasConstraint<R> = Box<dyn FnOnce(TinyBuilder<R>) -> TinyBuilder<R>>;

impl<M: Model> TinyBuilder<M> {
    /// Parents whose related count satisfies `operator count`
    pub fn has(self, relation: &str, operator: &str, count: i64) -> OrmResult<Self> {
        let operator = count_operator(operator)?;
        self.has_constrained(relation, operator, count, None, WhereBoolean::And)
    }

    pub fn or_has(self, relation: &str, operator: &str, count: i64) -> OrmResult<Self> {
        let operator = count_operator(operator)?;
        self.has_constrained(relation, operator, count, None, WhereBoolean::Or)
    }

    /// Parents without any related row
    pub fn doesnt_have(self, relation: &str) -> OrmResult<Self> {
        self.has_constrained(relation, QueryOperator::LessThan, 1, None, WhereBoolean::And)
    }

    pub fn or_doesnt_have(self, relation: &str) -> OrmResult<Self> {
        self.has_constrained(relation, QueryOperator::LessThan, 1, None, WhereBoolean::Or)
    }

    /// Parents with at least one related row matching `callback`.
    ///
    /// `R` is the model of the last relation of a dotted name.
    pub fn where_has<R, F>(self, relation: &str, callback: F) -> OrmResult<Self>
    where
        R: Model,
        F: FnOnce(TinyBuilder<R>) -> TinyBuilder<R> + 'static,
    {
        self.where_has_count(relation, callback, ">=", 1)
    }

    /// Parents whose count of related rows matching `callback` satisfies
    /// `operator count`
    pub fn where_has_count<R, F>(self, relation: &str, callback: F, operator: &str, count: i64) -> OrmResult<Self>
    where
        R: Model,
        F: FnOnce(TinyBuilder<R>) -> TinyBuilder<R> + 'static,
    {
        let operator = count_operator(operator)?;
        self.has_constrained(relation, operator, count, Some(constraint(callback)), WhereBoolean::And)
    }

    pub fn or_where_has<R, F>(self, relation: &str, callback: F) -> OrmResult<Self>
    where
        R: Model,
        F: FnOnce(TinyBuilder<R>) -> TinyBuilder<R> + 'static,
    {
        self.has_constrained(
            relation,
            QueryOperator::GreaterThanOrEqual,
            1,
            Some(constraint(callback)),
            WhereBoolean::Or,
        )
    }

    /// Parents without a related row matching `callback`
    pub fn where_doesnt_have<R, F>(self, relation: &str, callback: F) -> OrmResult<Self>
    where
        R: Model,
        F: FnOnce(TinyBuilder<R>) -> TinyBuilder<R> + 'static,
    {
        self.has_constrained(relation, QueryOperator::LessThan, 1, Some(constraint(callback)), WhereBoolean::And)
    }

    pub fn or_where_doesnt_have<R, F>(self, relation: &str, callback: F) -> OrmResult<Self>
    where
        R: Model,
        F: FnOnce(TinyBuilder<R>) -> TinyBuilder<R> + 'static,
    {
        self.has_constrained(relation, QueryOperator::LessThan, 1, Some(constraint(callback)), WhereBoolean::Or)
    }

    pub(crate) fn has_constrained(
        mut self,
        relation: &str,
        operator: QueryOperator,
        count: i64,
        constraint: Option<Box<dyn Any>>,
        boolean: WhereBoolean,
    ) -> OrmResult<Self> {
        let (name, nested) = match relation.split_once('.') {
            Some((name, rest)) => (name, Some(rest.to_string())),
            None => (relation, None),
        };

        let mut store = RelationStore::query_relationships(ExistenceRequest {
            operator,
            count,
            nested,
            constraint,
        });
        visit_relation(&mut self.model, name, &mut store)?;

        let clause = store.take_existence_clause().ok_or_else(|| {
            ModelError::RelationStore(format!("relation '{}' built no existence clause", name))
        })?;
        self.apply(|q| clause.apply(q, boolean));
        Ok(self)
    }
}

fn constraint<R, F>(callback: F) -> Box<dyn Any>
where
    R: Model,
    F: FnOnce(TinyBuilder<R>) -> TinyBuilder<R> + 'static,
{
    let callback: HasConstraint<R> = Box::new(callback);
    Box::new(callback)
}

/// Comparison operators only, `LIKE` and friends cannot compare a count
fn count_operator(operator: &str) -> OrmResult<QueryOperator> {
    QueryOperator::parse(operator)
        .filter(|operator| {
            matches!(
                operator,
                QueryOperator::Equal
                    | QueryOperator::NotEqual
                    | QueryOperator::GreaterThan
                    | QueryOperator::GreaterThanOrEqual
                    | QueryOperator::LessThan
                    | QueryOperator::LessThanOrEqual
            )
        })
        .ok_or_else(|| ModelError::Query(format!("'{}' cannot compare a relation count", operator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{Comment, Post};
    use crate::query::QueryGrammar;

    #[test]
    fn test_has_compiles_an_in_subquery() {
        let builder = Post::default().new_query().has("comments", ">=", 1).unwrap();
        let (sql, params) = QueryGrammar::default().compile_select(&builder.to_base());

        assert_eq!(
            sql,
            "SELECT * FROM posts WHERE posts.id IN (SELECT comments.post_id FROM comments \
             WHERE comments.post_id IS NOT NULL)"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_doesnt_have_keeps_parents_without_key() {
        let builder = Comment::default().new_query().doesnt_have("post").unwrap();
        let (sql, _) = QueryGrammar::default().compile_select(&builder.to_base());

        assert_eq!(
            sql,
            "SELECT * FROM comments WHERE (comments.post_id NOT IN (SELECT posts.id FROM posts \
             WHERE posts.id IS NOT NULL) OR comments.post_id IS NULL)"
        );
    }

    #[test]
    fn test_where_has_count_binds_constraint_then_count() {
        let builder = Post::default()
            .new_query()
            .where_has_count::<Comment, _>("comments", |q| q.where_eq("body", "x"), ">", 2)
            .unwrap();
        let (sql, params) = QueryGrammar::default().compile_select(&builder.to_base());

        assert_eq!(
            sql,
            "SELECT * FROM posts WHERE posts.id IN (SELECT comments.post_id FROM comments \
             WHERE body = $1 AND comments.post_id IS NOT NULL GROUP BY comments.post_id \
             HAVING COUNT(*) > $2)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_constraint_for_wrong_model_fails() {
        let result = Post::default()
            .new_query()
            .where_has::<Post, _>("comments", |q| q);
        assert!(matches!(result, Err(ModelError::RelationMapping { .. })));
    }

    #[test]
    fn test_unknown_relation_and_operator_fail() {
        assert!(matches!(
            Post::default().new_query().has("authors", ">=", 1),
            Err(ModelError::RelationNotFound { .. })
        ));
        assert!(matches!(
            Post::default().new_query().has("comments", "like", 1),
            Err(ModelError::Query(_))
        ));
    }
}
