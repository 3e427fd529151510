//! HasMany Relationship - parent model has many related models

use std::ops::{Deref, DerefMut};

use super::has_one_or_many::HasOneOrMany;
use super::traits::{Relation, RelationKind};
use super::value::RelationValue;
use crate::error::OrmResult;
use crate::model::Model;
use crate::tiny_builder::TinyBuilder;

/// HasMany relationship, the related table holds the foreign key
pub struct HasMany<M: Model, R: Model> {
    inner: HasOneOrMany<M, R>,
}

impl<M: Model, R: Model> HasMany<M, R> {
    pub fn new(parent: &M, related: R, foreign_key: String, local_key: String) -> Self {
        Self {
            inner: HasOneOrMany::new(parent, related, foreign_key, local_key),
        }
    }
}

impl<M: Model, R: Model> Deref for HasMany<M, R> {
    type Target = HasOneOrMany<M, R>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Model, R: Model> DerefMut for HasMany<M, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<M: Model, R: Model> Relation<M, R> for HasMany<M, R> {
    fn kind(&self) -> RelationKind {
        RelationKind::Many
    }

    fn related(&self) -> &R {
        &self.inner.related
    }

    fn query(&self) -> &TinyBuilder<R> {
        &self.inner.query
    }

    fn query_mut(&mut self) -> &mut TinyBuilder<R> {
        &mut self.inner.query
    }

    fn add_eager_constraints(&mut self, models: &[M]) {
        self.inner.add_eager_constraints(models);
    }

    fn existence_keys(&self) -> (String, String) {
        self.inner.existence_keys()
    }

    fn match_results(&self, models: &mut [M], results: Vec<R>, relation: &str) {
        self.inner.match_many(models, results, relation);
    }

    fn get_results(&self) -> OrmResult<RelationValue> {
        if self.inner.get_parent_key().is_null() {
            return Ok(RelationValue::many::<R>(Vec::new()));
        }
        Ok(RelationValue::many(self.inner.query.get()?))
    }
}
