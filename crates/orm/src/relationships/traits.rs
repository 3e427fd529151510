//! Relationship Traits - the contract every relation type implements

use std::collections::HashMap;

use super::value::RelationValue;
use crate::backends::{AttributeItem, Value};
use crate::error::OrmResult;
use crate::model::{HasAttributes, Model};
use crate::query::{qualify, unqualified};
use crate::tiny_builder::TinyBuilder;

/// Shape of a relation's resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    One,
    Many,
}

/// A relation from parent model `M` to related model `R`.
///
/// A relation object lives for one resolution: it is built from the parent
/// by the registered factory, queried, and dropped. Only the resolved value
/// is cached on the parent.
pub trait Relation<M: Model, R: Model> {
    fn kind(&self) -> RelationKind;

    /// The related template instance
    fn related(&self) -> &R;

    /// Query for the related models, constraints already applied
    fn query(&self) -> &TinyBuilder<R>;

    fn query_mut(&mut self) -> &mut TinyBuilder<R>;

    /// Constrain the query to every parent in the batch at once
    fn add_eager_constraints(&mut self, models: &[M]);

    /// Write the eager results onto the parents they belong to
    fn match_results(&self, models: &mut [M], results: Vec<R>, relation: &str);

    /// Parent column and related column an existence subquery links on
    fn existence_keys(&self) -> (String, String);

    /// Resolve the relation for the parent it was built from
    fn get_results(&self) -> OrmResult<RelationValue>;

    /// Give every parent an empty value so unmatched parents read as loaded
    fn init_relation(&self, models: &mut [M], relation: &str) {
        for model in models.iter_mut() {
            let value = match self.kind() {
                RelationKind::Many => RelationValue::many::<R>(Vec::new()),
                RelationKind::One => RelationValue::one::<R>(None),
            };
            model.base_mut().relations.insert(relation.to_string(), value);
        }
    }

    /// Run the eager query
    fn get_eager(&self) -> OrmResult<Vec<R>> {
        self.query().get()
    }

    /// Bump the related side's update timestamp without saving content
    fn touch(&self) -> OrmResult<u64> {
        self.query().touch()
    }

    /// Qualify a column of a `"relation:col1,col2"` selection
    fn qualify_column(&self, column: &str) -> String {
        qualify(R::table_name(), column)
    }
}

/// Unsaved instance a one to one relation resolves to when nothing matches,
/// filled past the guards
pub(crate) fn default_model<R: Model>(related: &R, attributes: Vec<AttributeItem>) -> R {
    let mut model = related.new_instance();
    if let Err(err) = model.force_fill(attributes.iter().cloned()) {
        tracing::warn!("Default {} keeps its attributes unconverted: {}", R::model_name(), err);
        model.set_raw_attributes(attributes, false);
    }
    model
}

/// Sorted, de-duplicated, non-null values of `key` across `models`
pub(crate) fn collect_keys<M: Model>(models: &[M], key: &str) -> Vec<Value> {
    let column = unqualified(key);
    let mut keys: Vec<Value> = models
        .iter()
        .filter_map(|model| model.get_attribute(column).cloned())
        .filter(|value| !value.is_null())
        .collect();

    keys.sort_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));
    keys.dedup_by(|a, b| a.key_string() == b.key_string());
    keys
}

/// Group `results` by the key form of their `key` attribute
pub(crate) fn build_dictionary<R: Model>(results: Vec<R>, key: &str) -> HashMap<String, Vec<R>> {
    let column = unqualified(key);
    let mut dictionary: HashMap<String, Vec<R>> = HashMap::new();

    for result in results {
        if let Some(key) = result.get_attribute(column).and_then(Value::key_string) {
            dictionary.entry(key).or_default().push(result);
        }
    }
    dictionary
}

/// Key form of a parent's `key` attribute
pub(crate) fn model_key<M: Model>(model: &M, key: &str) -> Option<String> {
    model
        .get_attribute(unqualified(key))
        .and_then(Value::key_string)
}
