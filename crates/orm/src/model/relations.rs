//! Relation access on model instances
//!
//! Resolved relation values are cached per name in the model's relation map;
//! a present key means resolved, possibly to an empty list or `None`.
//! Relation objects themselves are never cached.

use std::any::type_name;
use std::collections::HashMap;

use super::attributes::HasAttributes;
use super::core_trait::{snake_case, Model};
use super::crud_operations::CrudOperations;
use crate::error::{ModelError, OrmResult};
use crate::query::qualify;
use crate::relationships::{
    visit_relation, BelongsTo, BelongsToMany, HasMany, HasOne, RelationStore, RelationStoreState,
    RelationValue,
};

pub trait HasRelations: Model {
    fn get_relations(&self) -> &HashMap<String, RelationValue> {
        &self.base().relations
    }

    fn relation_loaded(&self, name: &str) -> bool {
        self.base().relations.contains_key(name)
    }

    fn set_relation(&mut self, name: &str, value: RelationValue) -> &mut Self {
        self.base_mut().relations.insert(name.to_string(), value);
        self
    }

    fn unset_relation(&mut self, name: &str) -> &mut Self {
        self.base_mut().relations.remove(name);
        self
    }

    fn unset_relations(&mut self) -> &mut Self {
        self.base_mut().relations.clear();
        self
    }

    /// Loaded models of a many relation
    fn get_relation<R: Model>(&self, name: &str) -> OrmResult<&[R]> {
        let value = loaded_relation(self, name)?;
        match value.as_many::<R>() {
            Some(models) => Ok(models),
            None => Err(mismatch::<Self, R>(name, value, "many")),
        }
    }

    fn get_relation_mut<R: Model>(&mut self, name: &str) -> OrmResult<&mut Vec<R>> {
        loaded_relation(self, name)?;
        let value = self
            .base_mut()
            .relations
            .get_mut(name)
            .ok_or_else(|| not_loaded::<Self>(name))?;
        if value.as_many::<R>().is_none() {
            return Err(mismatch::<Self, R>(name, value, "many"));
        }
        value
            .as_many_mut::<R>()
            .ok_or_else(|| ModelError::RelationType(name.to_string()))
    }

    /// Loaded model of a one relation, `None` when it resolved to nothing
    fn get_relation_one<R: Model>(&self, name: &str) -> OrmResult<Option<&R>> {
        let value = loaded_relation(self, name)?;
        match value.as_one::<R>() {
            Some(model) => Ok(model.as_ref()),
            None => Err(mismatch::<Self, R>(name, value, "one")),
        }
    }

    fn get_relation_one_mut<R: Model>(&mut self, name: &str) -> OrmResult<Option<&mut R>> {
        loaded_relation(self, name)?;
        let value = self
            .base_mut()
            .relations
            .get_mut(name)
            .ok_or_else(|| not_loaded::<Self>(name))?;
        if value.as_one::<R>().is_none() {
            return Err(mismatch::<Self, R>(name, value, "one"));
        }
        value
            .as_one_mut::<R>()
            .map(Option::as_mut)
            .ok_or_else(|| ModelError::RelationType(name.to_string()))
    }

    /// Many relation, lazy loaded on first access when declared.
    ///
    /// Names that are not declared read as empty.
    fn get_relation_value<R: Model>(&mut self, name: &str) -> OrmResult<&[R]> {
        if !self.relation_loaded(name) {
            if !Self::relation_registry()?.contains(name) {
                return Ok(&[]);
            }
            self.get_relationship_from_method::<R>(name)?;
        }
        self.get_relation::<R>(name)
    }

    /// One relation, lazy loaded on first access when declared
    fn get_relation_value_one<R: Model>(&mut self, name: &str) -> OrmResult<Option<&R>> {
        if !self.relation_loaded(name) {
            if !Self::relation_registry()?.contains(name) {
                return Ok(None);
            }
            self.get_relationship_from_method::<R>(name)?;
        }
        self.get_relation_one::<R>(name)
    }

    /// Resolve relation `name` through its factory and cache the value
    fn get_relationship_from_method<R: Model>(&mut self, name: &str) -> OrmResult<&mut Self> {
        let registry = Self::relation_registry()?;
        registry.validate_user_relation(name)?;
        let factory = registry.get_relation_method_raw::<R>(name)?;

        let value = factory(self).get_results()?;
        tracing::debug!("Lazy loaded relation '{}' of {}", name, Self::model_name());
        Ok(self.set_relation(name, value))
    }

    /// Eager load `relations` onto this instance
    fn load(&mut self, relations: &[&str]) -> OrmResult<&mut Self> {
        if relations.is_empty() {
            return Ok(self);
        }

        let builder = self
            .new_query_without_relationships()
            .with(relations.iter().copied())?;
        let mut models = vec![self.clone()];
        builder.eager_load_relations(&mut models)?;

        if let Some(mut loaded) = models.pop() {
            for (name, value) in loaded.base_mut().relations.drain() {
                self.base_mut().relations.insert(name, value);
            }
        }
        Ok(self)
    }

    /// Save this model and every loaded relation, recursively.
    ///
    /// Stops at the first failure; rows saved before it stay saved.
    fn push(&mut self) -> OrmResult<bool> {
        if !self.save()? {
            return Ok(false);
        }
        if self.base().relations.is_empty() {
            return Ok(true);
        }

        let mut relations = std::mem::take(&mut self.base_mut().relations);
        let result = push_relations(self, &mut relations);

        let base = self.base_mut();
        for (name, value) in base.relations.drain() {
            relations.entry(name).or_insert(value);
        }
        base.relations = relations;
        result
    }

    /// Touch the owners named in `touches()` and cascade to theirs.
    ///
    /// Owners are followed without cycle detection, so a `touches()` graph
    /// that loops back on itself recurses without bound.
    fn touch_owners(&mut self) -> OrmResult<()> {
        for name in Self::touches() {
            let mut store = RelationStore::touch_owners();
            visit_relation(self, name, &mut store)?;
        }
        Ok(())
    }

    fn touches_relation(&self, name: &str) -> bool {
        Self::touches().contains(&name)
    }

    /// Operation currently running on this instance's relations
    fn relation_store_state(&self) -> RelationStoreState {
        self.base().store.state()
    }

    /// A related instance sharing this model's connection selection
    fn new_related<R: Model>(&self) -> R {
        let mut related = R::default();
        if R::connection_name().is_none() {
            related.base_mut().connection = self.base().connection.clone();
        }
        related.base_mut().resolver = self.base().resolver.clone();
        related
    }

    /// The related table's `foreign_key` points at this model's `local_key`
    fn has_one<R: Model>(&self, foreign_key: Option<&str>, local_key: Option<&str>) -> HasOne<Self, R> {
        let foreign_key = foreign_key.map_or_else(|| self.get_foreign_key(), str::to_string);
        let local_key = local_key.unwrap_or(Self::primary_key_name());
        HasOne::new(
            self,
            self.new_related::<R>(),
            qualify(R::table_name(), &foreign_key),
            local_key.to_string(),
        )
    }

    fn has_many<R: Model>(&self, foreign_key: Option<&str>, local_key: Option<&str>) -> HasMany<Self, R> {
        let foreign_key = foreign_key.map_or_else(|| self.get_foreign_key(), str::to_string);
        let local_key = local_key.unwrap_or(Self::primary_key_name());
        HasMany::new(
            self,
            self.new_related::<R>(),
            qualify(R::table_name(), &foreign_key),
            local_key.to_string(),
        )
    }

    /// This model's `foreign_key` points at the owner's `owner_key`; the
    /// foreign key defaults to the snake cased relation name plus `_id`
    fn belongs_to<R: Model>(
        &self,
        relation: &str,
        foreign_key: Option<&str>,
        owner_key: Option<&str>,
    ) -> BelongsTo<Self, R> {
        let foreign_key = foreign_key.map_or_else(
            || format!("{}_{}", snake_case(relation), R::primary_key_name()),
            str::to_string,
        );
        let owner_key = owner_key.unwrap_or(R::primary_key_name());
        BelongsTo::new(
            self,
            self.new_related::<R>(),
            foreign_key,
            owner_key.to_string(),
            relation.to_string(),
        )
    }

    /// Many to many through `table`, which defaults to both model names in
    /// snake case, sorted and joined by `_`
    fn belongs_to_many<R: Model>(
        &self,
        table: Option<&str>,
        foreign_pivot_key: Option<&str>,
        related_pivot_key: Option<&str>,
        parent_key: Option<&str>,
        related_key: Option<&str>,
    ) -> BelongsToMany<Self, R> {
        let related = self.new_related::<R>();
        let table = table.map_or_else(|| joining_table::<Self, R>(), str::to_string);
        let foreign_pivot_key = foreign_pivot_key.map_or_else(|| self.get_foreign_key(), str::to_string);
        let related_pivot_key = related_pivot_key.map_or_else(|| related.get_foreign_key(), str::to_string);

        BelongsToMany::new(
            self,
            related,
            table,
            foreign_pivot_key,
            related_pivot_key,
            parent_key.unwrap_or(Self::primary_key_name()).to_string(),
            related_key.unwrap_or(R::primary_key_name()).to_string(),
        )
    }
}

impl<M: Model> HasRelations for M {}

/// Push every loaded relation in name order, stopping at the first failure
fn push_relations<M: Model>(model: &mut M, relations: &mut HashMap<String, RelationValue>) -> OrmResult<bool> {
    let mut names: Vec<String> = relations.keys().cloned().collect();
    names.sort();

    for name in names {
        let Some(value) = relations.get_mut(&name) else {
            continue;
        };
        let mut store = RelationStore::push(value);
        visit_relation(model, &name, &mut store)?;
        if !store.push_result() {
            tracing::warn!("Push of relation '{}' on {} failed", name, M::model_name());
            return Ok(false);
        }
    }
    Ok(true)
}

/// Default pivot table name of a many to many relation
pub fn joining_table<M: Model, R: Model>() -> String {
    let mut segments = [snake_case(M::model_name()), snake_case(R::model_name())];
    segments.sort();
    segments.join("_")
}

/// Value of a declared and loaded relation
fn loaded_relation<'a, M: Model>(model: &'a M, name: &str) -> OrmResult<&'a RelationValue> {
    M::relation_registry()?.validate_user_relation(name)?;
    model
        .base()
        .relations
        .get(name)
        .ok_or_else(|| not_loaded::<M>(name))
}

fn not_loaded<M: Model>(name: &str) -> ModelError {
    ModelError::RelationNotLoaded {
        model: M::model_name().to_string(),
        relation: name.to_string(),
    }
}

/// Error for a loaded value read with the wrong shape or related type
fn mismatch<M: Model, R: Model>(name: &str, value: &RelationValue, requested: &str) -> ModelError {
    let shape_matches = match requested {
        "many" => value.is_many(),
        _ => value.is_one(),
    };
    if shape_matches {
        ModelError::RelationMapping {
            model: M::model_name().to_string(),
            relation: name.to_string(),
            expected: type_name::<R>().to_string(),
            registered: "a different loaded type".to_string(),
        }
    } else {
        ModelError::RelationType(format!(
            "relation '{}' of '{}' is not a {} relation",
            name,
            M::model_name(),
            requested
        ))
    }
}
