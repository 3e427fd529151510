//! Eager loading
//!
//! Top level items are visited on a clone of the builder's template model;
//! the visitor recovers the related type and calls back into
//! [`TinyBuilder::eager_load_relation_visited`], which loads one relation
//! for the whole batch with a single query. Dotted items travel to the
//! related builder and load one level further down the same way.

use super::with::{add_with_item, relations_nested_under, WithItem};
use super::TinyBuilder;
use crate::error::OrmResult;
use crate::model::Model;
use crate::relationships::dispatch::eager_relation;
use crate::relationships::{visit_relation, RelationFactory, RelationStore};

impl<M: Model> TinyBuilder<M> {
    /// Load every top level eager load item onto `models`
    pub fn eager_load_relations(&self, models: &mut Vec<M>) -> OrmResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        for item in self.eager_load.iter().filter(|item| !item.name.contains('.')) {
            let mut template = self.model.clone();
            let mut store = RelationStore::eager(item, self, models);
            visit_relation(&mut template, &item.name, &mut store)?;
        }
        Ok(())
    }

    /// Load relation `with` of related type `R` onto the whole batch
    pub(crate) fn eager_load_relation_visited<R: Model>(
        &self,
        factory: RelationFactory<M, R>,
        template: &M,
        with: &WithItem,
        models: &mut Vec<M>,
    ) -> OrmResult<()> {
        let mut relation = eager_relation(factory, template);

        let nested = relations_nested_under(&self.eager_load, &with.name);
        if !nested.is_empty() {
            let query = relation.query_mut();
            let mut items = query.get_eager_loads().to_vec();
            for item in nested {
                add_with_item(&mut items, item);
            }
            query.set_eager_loads(items);
        }

        relation.add_eager_constraints(models);

        if let Some(constraint) = &with.constraint {
            relation.query_mut().apply(|q| constraint(q));
        }
        if !with.columns.is_empty() {
            let columns: Vec<String> = with
                .columns
                .iter()
                .map(|column| relation.qualify_column(column))
                .collect();
            relation.query_mut().apply(|q| q.select_columns(&columns));
        }

        let results = relation.get_eager()?;
        tracing::debug!(
            "Eager loaded {} '{}' model(s) for {} {} parent(s)",
            results.len(),
            with.name,
            models.len(),
            M::model_name()
        );

        relation.init_relation(models, &with.name);
        relation.match_results(models, results, &with.name);
        Ok(())
    }
}
