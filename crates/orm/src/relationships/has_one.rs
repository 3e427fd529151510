//! HasOne Relationship - parent model has one related model

use std::ops::{Deref, DerefMut};

use super::has_one_or_many::HasOneOrMany;
use super::traits::{default_model, Relation, RelationKind};
use super::value::RelationValue;
use crate::backends::AttributeItem;
use crate::error::OrmResult;
use crate::model::{HasAttributes, Model};
use crate::tiny_builder::TinyBuilder;

/// HasOne relationship, the related table holds the foreign key.
///
/// When several related rows match, the first one returned wins.
pub struct HasOne<M: Model, R: Model> {
    inner: HasOneOrMany<M, R>,
    default: Option<R>,
}

impl<M: Model, R: Model> HasOne<M, R> {
    pub fn new(parent: &M, related: R, foreign_key: String, local_key: String) -> Self {
        Self {
            inner: HasOneOrMany::new(parent, related, foreign_key, local_key),
            default: None,
        }
    }

    /// Resolve to a new unsaved related model instead of `None`
    pub fn with_default(self) -> Self {
        self.with_default_attributes(Vec::<AttributeItem>::new())
    }

    /// Like [`HasOne::with_default`], the default carries `attributes`
    pub fn with_default_attributes<I, T>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        let attributes = attributes.into_iter().map(Into::into).collect();
        self.default = Some(default_model(&self.inner.related, attributes));
        self
    }

    fn default_for_parent(&self) -> Option<R> {
        let key = self.inner.get_parent_key().clone();
        self.default
            .as_ref()
            .map(|template| self.inner.default_for(template, key))
    }
}

impl<M: Model, R: Model> Deref for HasOne<M, R> {
    type Target = HasOneOrMany<M, R>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Model, R: Model> DerefMut for HasOne<M, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<M: Model, R: Model> Relation<M, R> for HasOne<M, R> {
    fn kind(&self) -> RelationKind {
        RelationKind::One
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
        self.inner.match_one(models, results, relation, self.default.as_ref());
    }

    fn init_relation(&self, models: &mut [M], relation: &str) {
        for model in models.iter_mut() {
            let value = self.default.as_ref().map(|template| {
                let key = model
                    .get_attribute(self.inner.get_local_key_name())
                    .cloned()
                    .unwrap_or_default();
                self.inner.default_for(template, key)
            });
            model
                .base_mut()
                .relations
                .insert(relation.to_string(), RelationValue::one(value));
        }
    }

    fn get_results(&self) -> OrmResult<RelationValue> {
        if self.inner.get_parent_key().is_null() {
            return Ok(RelationValue::one(self.default_for_parent()));
        }
        let related = self.inner.query.first()?.or_else(|| self.default_for_parent());
        Ok(RelationValue::one(related))
    }
}
