//! Relationship Registry - per model type map from relation name to factory
//!
//! Factories produce `Box<dyn Relation<M, R>>` for a different `R` per
//! relation, so the map stores them erased as `dyn Any`. Each entry also keeps
//! the visitor monomorphized for its `R` at registration time, which is how
//! dispatch by name recovers the related type.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::dispatch::{relation_visited, VisitFn};
use super::traits::Relation;
use crate::error::{ModelError, OrmResult};
use crate::model::Model;

/// Builds relation `R` of parent `M`
pub type RelationFactory<M, R> = fn(&M) -> Box<dyn Relation<M, R>>;

struct RelationEntry<M: Model> {
    factory: Box<dyn Any + Send + Sync>,
    visited: VisitFn<M>,
    related_type: &'static str,
}

/// Relation factories declared by one model type
pub struct RelationRegistry<M: Model> {
    relations: HashMap<String, RelationEntry<M>>,
}

impl<M: Model> std::fmt::Debug for RelationRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationRegistry")
            .field("model", &M::model_name())
            .field("relations", &self.names())
            .finish()
    }
}

impl<M: Model> Default for RelationRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> RelationRegistry<M> {
    pub fn new() -> Self {
        Self {
            relations: HashMap::new(),
        }
    }

    /// Register relation `name` producing related models of type `R`
    pub fn relation<R: Model>(&mut self, name: &str, factory: RelationFactory<M, R>) -> &mut Self {
        if self.relations.contains_key(name) {
            tracing::warn!(
                "Relation '{}' on model '{}' registered twice, keeping the last factory",
                name,
                M::model_name()
            );
        }

        self.relations.insert(
            name.to_string(),
            RelationEntry {
                factory: Box::new(factory),
                visited: relation_visited::<M, R>,
                related_type: type_name::<R>(),
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Registered relation names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Fail with `RelationNotFound` unless `name` is registered
    pub fn validate_user_relation(&self, name: &str) -> OrmResult<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ModelError::relation_not_found(M::model_name(), name))
        }
    }

    /// Recover the typed factory of relation `name`.
    ///
    /// The registration fixes `R` for a name; asking for another related type
    /// is a defect at the call site and fails with `RelationMapping`.
    pub fn get_relation_method_raw<R: Model>(&self, name: &str) -> OrmResult<RelationFactory<M, R>> {
        let entry = self
            .relations
            .get(name)
            .ok_or_else(|| ModelError::relation_not_found(M::model_name(), name))?;

        match entry.factory.downcast_ref::<RelationFactory<M, R>>() {
            Some(factory) => Ok(*factory),
            None => {
                tracing::error!(
                    "Relation '{}' on model '{}' is registered for '{}', requested as '{}'",
                    name,
                    M::model_name(),
                    entry.related_type,
                    type_name::<R>()
                );
                Err(ModelError::RelationMapping {
                    model: M::model_name().to_string(),
                    relation: name.to_string(),
                    expected: type_name::<R>().to_string(),
                    registered: entry.related_type.to_string(),
                })
            }
        }
    }

    /// Visitor bound to the related type of relation `name`
    pub(crate) fn visitor(&self, name: &str) -> OrmResult<VisitFn<M>> {
        self.relations
            .get(name)
            .map(|entry| entry.visited)
            .ok_or_else(|| ModelError::relation_not_found(M::model_name(), name))
    }
}

static REGISTRIES: Lazy<DashMap<TypeId, &'static (dyn Any + Send + Sync)>> = Lazy::new(DashMap::new);

/// The registry of model type `M`, built from `M::register_relations` on
/// first use and shared read-only afterwards
pub fn registry_for<M: Model>() -> OrmResult<&'static RelationRegistry<M>> {
    let type_id = TypeId::of::<M>();
    let existing = REGISTRIES.get(&type_id).map(|entry| *entry);

    let erased = match existing {
        Some(erased) => erased,
        // Built under the shard lock, so only one registry per type is ever
        // leaked. `register_relations` only stores factories and must not
        // resolve another registry.
        None => *REGISTRIES.entry(type_id).or_insert_with(|| {
            let mut registry = RelationRegistry::<M>::new();
            M::register_relations(&mut registry);
            tracing::debug!(
                "Registered {} relation(s) for model '{}'",
                registry.len(),
                M::model_name()
            );
            let leaked: &'static RelationRegistry<M> = Box::leak(Box::new(registry));
            leaked as &'static (dyn Any + Send + Sync)
        }),
    };

    erased.downcast_ref::<RelationRegistry<M>>().ok_or_else(|| {
        ModelError::RelationStore(format!(
            "relation registry for '{}' has an unexpected type",
            M::model_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::Comment;

    #[test]
    fn test_concurrent_first_use_shares_one_registry() {
        let registries: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry_for::<Comment>().map(|r| r as *const _ as usize)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap())
                .collect()
        });

        assert!(registries.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(registry_for::<Comment>().unwrap().len(), 1);
    }
}
