//! BelongsTo Relationship - child model belongs to an owner model
//!
//! The child carries the foreign key, the owner is matched on its owner key
//! (usually its primary key).

use std::marker::PhantomData;

use super::constraints::constraints_enabled;
use super::traits::{build_dictionary, collect_keys, default_model, model_key, Relation, RelationKind};
use super::value::RelationValue;
use crate::backends::{AttributeItem, Value};
use crate::error::OrmResult;
use crate::model::{HasAttributes, HasRelations, Model};
use crate::query::qualify;
use crate::tiny_builder::TinyBuilder;

pub struct BelongsTo<M: Model, R: Model> {
    query: TinyBuilder<R>,
    related: R,
    foreign_key: String,
    owner_key: String,
    child_key: Value,
    relation: String,
    default: Option<R>,
    _child: PhantomData<fn() -> M>,
}

impl<M: Model, R: Model> BelongsTo<M, R> {
    /// `foreign_key` is a column of the child, `owner_key` a column of the
    /// owner; `relation` is the name the relation is registered under
    pub fn new(child: &M, related: R, foreign_key: String, owner_key: String, relation: String) -> Self {
        let child_key = child.get_attribute(&foreign_key).cloned().unwrap_or_default();
        let mut query = related.new_query();

        if constraints_enabled() {
            let column = qualify(R::table_name(), &owner_key);
            let key = child_key.clone();
            query.apply(|q| q.where_eq(&column, key));
        }

        Self {
            query,
            related,
            foreign_key,
            owner_key,
            child_key,
            relation,
            default: None,
            _child: PhantomData,
        }
    }

    /// Resolve to a new unsaved owner instead of `None`
    pub fn with_default(self) -> Self {
        self.with_default_attributes(Vec::<AttributeItem>::new())
    }

    /// Like [`BelongsTo::with_default`], the default carries `attributes`
    pub fn with_default_attributes<I, T>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        let attributes = attributes.into_iter().map(Into::into).collect();
        self.default = Some(default_model(&self.related, attributes));
        self
    }

    pub fn get_foreign_key_name(&self) -> &str {
        &self.foreign_key
    }

    pub fn get_owner_key_name(&self) -> &str {
        &self.owner_key
    }

    pub fn get_qualified_owner_key_name(&self) -> String {
        qualify(R::table_name(), &self.owner_key)
    }

    pub fn get_relation_name(&self) -> &str {
        &self.relation
    }

    /// Point `child` at `owner` and cache the owner as the loaded relation
    pub fn associate(&self, child: &mut M, owner: &R) -> OrmResult<()> {
        let owner_key = owner.get_attribute(&self.owner_key).cloned().unwrap_or_default();
        child.set_attribute(&self.foreign_key, owner_key)?;
        child.set_relation(&self.relation, RelationValue::one(Some(owner.clone())));
        Ok(())
    }

    /// Clear the foreign key of `child` and its cached owner
    pub fn dissociate(&self, child: &mut M) -> OrmResult<()> {
        child.set_attribute(&self.foreign_key, Value::Null)?;
        child.set_relation(&self.relation, RelationValue::one::<R>(None));
        Ok(())
    }
}

impl<M: Model, R: Model> Relation<M, R> for BelongsTo<M, R> {
    fn kind(&self) -> RelationKind {
        RelationKind::One
    }

    fn related(&self) -> &R {
        &self.related
    }

    fn query(&self) -> &TinyBuilder<R> {
        &self.query
    }

    fn query_mut(&mut self) -> &mut TinyBuilder<R> {
        &mut self.query
    }

    fn add_eager_constraints(&mut self, models: &[M]) {
        let keys = collect_keys(models, &self.foreign_key);
        let column = self.get_qualified_owner_key_name();
        self.query.apply(|q| q.where_in(&column, keys));
    }

    fn existence_keys(&self) -> (String, String) {
        (qualify(M::table_name(), &self.foreign_key), self.get_qualified_owner_key_name())
    }

    fn match_results(&self, models: &mut [M], results: Vec<R>, relation: &str) {
        let dictionary = build_dictionary(results, &self.owner_key);
        for model in models.iter_mut() {
            let owner = model_key(model, &self.foreign_key)
                .and_then(|key| dictionary.get(&key))
                .and_then(|owners| owners.first().cloned())
                .or_else(|| self.default.clone());
            model
                .base_mut()
                .relations
                .insert(relation.to_string(), RelationValue::one(owner));
        }
    }

    fn init_relation(&self, models: &mut [M], relation: &str) {
        for model in models.iter_mut() {
            model
                .base_mut()
                .relations
                .insert(relation.to_string(), RelationValue::one(self.default.clone()));
        }
    }

    fn get_results(&self) -> OrmResult<RelationValue> {
        if self.child_key.is_null() {
            return Ok(RelationValue::one(self.default.clone()));
        }
        let owner = self.query.first()?.or_else(|| self.default.clone());
        Ok(RelationValue::one(owner))
    }
}
