//! Shared core of HasOne and HasMany
//!
//! The related table carries a foreign key pointing at a local key of the
//! parent. The lazy constraint is `foreign_key = parent key`; eager loading
//! replaces it with one `foreign_key IN (...)` over the whole batch.

use std::marker::PhantomData;

use super::constraints::constraints_enabled;
use super::traits::{build_dictionary, collect_keys, model_key};
use super::value::RelationValue;
use crate::backends::{AttributeItem, Value};
use crate::error::OrmResult;
use crate::model::base::upsert;
use crate::model::{CrudOperations, HasAttributes, Model};
use crate::query::{qualify, unqualified};
use crate::tiny_builder::TinyBuilder;

pub struct HasOneOrMany<M: Model, R: Model> {
    pub(crate) query: TinyBuilder<R>,
    pub(crate) related: R,
    foreign_key: String,
    local_key: String,
    parent_key: Value,
    _parent: PhantomData<fn() -> M>,
}

impl<M: Model, R: Model> HasOneOrMany<M, R> {
    /// `foreign_key` is qualified with the related table, `local_key` is a
    /// column of the parent
    pub fn new(parent: &M, related: R, foreign_key: String, local_key: String) -> Self {
        let parent_key = parent.get_attribute(&local_key).cloned().unwrap_or_default();
        let mut query = related.new_query();

        if constraints_enabled() {
            let key = parent_key.clone();
            query.apply(|q| q.where_eq(&foreign_key, key).where_not_null(&foreign_key));
        }

        Self {
            query,
            related,
            foreign_key,
            local_key,
            parent_key,
            _parent: PhantomData,
        }
    }

    pub fn get_qualified_foreign_key_name(&self) -> &str {
        &self.foreign_key
    }

    pub fn get_foreign_key_name(&self) -> &str {
        unqualified(&self.foreign_key)
    }

    pub fn get_local_key_name(&self) -> &str {
        &self.local_key
    }

    /// Value of the parent's local key this relation was built from
    pub fn get_parent_key(&self) -> &Value {
        &self.parent_key
    }

    pub(crate) fn existence_keys(&self) -> (String, String) {
        (qualify(M::table_name(), &self.local_key), self.foreign_key.clone())
    }

    pub(crate) fn add_eager_constraints(&mut self, models: &[M]) {
        let keys = collect_keys(models, &self.local_key);
        tracing::debug!(
            "Eager constraint {} IN {} key(s)",
            self.foreign_key,
            keys.len()
        );
        let foreign_key = self.foreign_key.clone();
        self.query.apply(|q| q.where_in(&foreign_key, keys));
    }

    /// Match the first result per parent, parents without one get a copy of
    /// `default` pointing at them
    pub(crate) fn match_one(&self, models: &mut [M], results: Vec<R>, relation: &str, default: Option<&R>) {
        let dictionary = build_dictionary(results, &self.foreign_key);
        for model in models.iter_mut() {
            let related = model_key(model, &self.local_key)
                .and_then(|key| dictionary.get(&key))
                .and_then(|matches| matches.first().cloned())
                .or_else(|| {
                    let key = model.get_attribute(&self.local_key).cloned().unwrap_or_default();
                    default.map(|template| self.default_for(template, key))
                });
            model
                .base_mut()
                .relations
                .insert(relation.to_string(), RelationValue::one(related));
        }
    }

    pub(crate) fn match_many(&self, models: &mut [M], results: Vec<R>, relation: &str) {
        let dictionary = build_dictionary(results, &self.foreign_key);
        for model in models.iter_mut() {
            let related = model_key(model, &self.local_key)
                .and_then(|key| dictionary.get(&key).cloned())
                .unwrap_or_default();
            model
                .base_mut()
                .relations
                .insert(relation.to_string(), RelationValue::many(related));
        }
    }

    /// Copy of the default template with the foreign key set to `key`
    pub(crate) fn default_for(&self, template: &R, key: Value) -> R {
        let mut model = template.clone();
        upsert(
            &mut model.base_mut().attributes,
            AttributeItem::new(self.get_foreign_key_name(), key),
        );
        model
    }

    /// A new related instance with the foreign key set, not saved
    pub fn make<I, T>(&self, attributes: I) -> OrmResult<R>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        let mut model = self.related.new_instance();
        model.fill(attributes)?;
        model.set_attribute(self.get_foreign_key_name(), self.parent_key.clone())?;
        Ok(model)
    }

    /// Set the foreign key on `model` and save it
    pub fn save(&self, model: &mut R) -> OrmResult<bool> {
        model.set_attribute(self.get_foreign_key_name(), self.parent_key.clone())?;
        model.save()
    }

    /// Save every model, stopping at the first failure
    pub fn save_many(&self, models: &mut [R]) -> OrmResult<bool> {
        for model in models.iter_mut() {
            if !self.save(model)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Create and save a related model
    pub fn create<I, T>(&self, attributes: I) -> OrmResult<R>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        let mut model = self.make(attributes)?;
        model.save()?;
        Ok(model)
    }
}
