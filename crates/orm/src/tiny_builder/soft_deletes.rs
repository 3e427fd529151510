//! Trashed scope of soft deleting models
//!
//! The scope is applied when a statement is compiled, see
//! [`TinyBuilder::to_base`]. Models without `soft_deletes()` ignore it.

use super::TinyBuilder;
use crate::backends::{AttributeItem, Value};
use crate::error::OrmResult;
use crate::model::{HasTimestamps, Model};
use crate::query::{qualify, QueryBuilder};

/// Which rows of a soft deleting model a query sees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrashedScope {
    /// `deleted_at IS NULL`
    #[default]
    Exclude,
    /// No constraint
    Include,
    /// `deleted_at IS NOT NULL`
    Only,
}

impl<M: Model> TinyBuilder<M> {
    pub fn with_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Include;
        self
    }

    pub fn without_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Exclude;
        self
    }

    pub fn only_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Only;
        self
    }

    pub fn trashed_scope(&self) -> TrashedScope {
        self.trashed
    }

    /// The query a statement is compiled from, the wrapped query with the
    /// trashed scope applied
    pub fn to_base(&self) -> QueryBuilder {
        let query = self.query.clone();
        if !M::soft_deletes() {
            return query;
        }

        let column = qualify(M::table_name(), M::deleted_at_column());
        match self.trashed {
            TrashedScope::Include => query,
            TrashedScope::Exclude => query.wrap_wheres().where_null(&column),
            TrashedScope::Only => query.wrap_wheres().where_not_null(&column),
        }
    }

    /// Delete the matched rows even when the model soft deletes
    pub fn force_delete(&self) -> OrmResult<u64> {
        Ok(self.connection()?.delete(&self.to_base())?.affected_rows)
    }

    /// Clear `deleted_at` of the matched trashed rows
    pub fn restore(&self) -> OrmResult<u64> {
        if !M::soft_deletes() {
            return Ok(0);
        }
        self.clone()
            .with_trashed()
            .update(vec![AttributeItem::new(M::deleted_at_column(), Value::Null)])
    }

    /// Stamp `deleted_at` on the matched rows
    pub(crate) fn soft_delete(&self) -> OrmResult<u64> {
        let deleted_at = self.model.fresh_timestamp_binding()?;
        self.update(vec![AttributeItem::new(
            qualify(M::table_name(), M::deleted_at_column()),
            deleted_at,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{Archived, Post};
    use crate::query::{QueryOperator, WhereBoolean};

    #[test]
    fn test_scope_is_added_at_compile_time() {
        let builder = Archived::default().new_query().where_eq("name", "a");
        assert_eq!(builder.get_query().get_wheres().len(), 1);

        let base = builder.to_base();
        let wheres = base.get_wheres();
        assert_eq!(wheres.len(), 2);
        assert_eq!(wheres[1].column, "archived.deleted_at");
        assert_eq!(wheres[1].operator, QueryOperator::IsNull);

        let only = builder.clone().only_trashed().to_base();
        assert_eq!(only.get_wheres()[1].operator, QueryOperator::IsNotNull);
        assert_eq!(builder.with_trashed().to_base().get_wheres().len(), 1);
    }

    #[test]
    fn test_or_chain_is_grouped_before_the_scope() {
        let base = Archived::default()
            .new_query()
            .where_eq("id", 1)
            .or_where_eq("id", 2)
            .to_base();

        let wheres = base.get_wheres();
        assert_eq!(wheres.len(), 2);
        assert_eq!(wheres[0].operator, QueryOperator::Nested);
        assert_eq!(wheres[1].boolean, WhereBoolean::And);
    }

    #[test]
    fn test_plain_model_has_no_scope() {
        let base = Post::default().new_query().only_trashed().to_base();
        assert!(base.get_wheres().is_empty());
    }
}
