//! Relation visitor dispatch
//!
//! [`visit_relation`] looks a relation up by name, claims the model's store
//! slot and calls the visitor registered for it. The visitor,
//! [`relation_visited`], is monomorphized per related type and routes the
//! store to the handler for its state through a table indexed by the state's
//! ordinal.

use super::constraints::no_constraints;
use super::registry::RelationFactory;
use super::store::{
    payload_mismatch, ExistenceClause, RelationStore, RelationStoreState, StoreGuard, StorePayload,
};
use super::traits::{Relation, RelationKind};
use crate::error::{ModelError, OrmResult};
use crate::model::{HasRelations, Model};
use crate::query::{QueryOperator, WhereBoolean};
use crate::tiny_builder::HasConstraint;

/// Visitor stored per relation in the registry
pub type VisitFn<M> = fn(&mut M, &str, &mut RelationStore<'_, M>) -> OrmResult<()>;

type StoreHandler<M, R> =
    fn(&mut M, &str, &mut RelationStore<'_, M>, RelationFactory<M, R>) -> OrmResult<()>;

// Handler table order below must follow the state ordinals
const _: () = assert!(
    RelationStoreState::EagerLoading as usize == 1
        && RelationStoreState::Pushing as usize == 2
        && RelationStoreState::TouchingOwners as usize == 3
        && RelationStoreState::QueryingRelationships as usize == 4
);

/// Visit relation `name` of `model` with `store`.
///
/// The model's store slot is held for the whole visit and is back to `Idle`
/// when this returns, whether the handler succeeded or not.
pub fn visit_relation<M: Model>(
    model: &mut M,
    name: &str,
    store: &mut RelationStore<'_, M>,
) -> OrmResult<()> {
    let registry = M::relation_registry()?;
    registry.validate_user_relation(name)?;
    let visited = registry.visitor(name)?;

    let _guard = StoreGuard::enter(&model.base().store, store.state())?;
    visited(model, name, store)
}

/// Visitor for relations whose related type is `R`
pub(crate) fn relation_visited<M: Model, R: Model>(
    model: &mut M,
    name: &str,
    store: &mut RelationStore<'_, M>,
) -> OrmResult<()> {
    let factory = M::relation_registry()?.get_relation_method_raw::<R>(name)?;

    let handlers: [StoreHandler<M, R>; 4] = [
        eager_visited::<M, R>,
        push_visited::<M, R>,
        touch_owners_visited::<M, R>,
        existence_visited::<M, R>,
    ];

    let state = store.state();
    let handler = (state as usize)
        .checked_sub(1)
        .and_then(|index| handlers.get(index))
        .ok_or_else(|| {
            tracing::error!("No relation handler for store state {:?}", state);
            ModelError::RelationStore(format!("no handler for store state {:?}", state))
        })?;

    handler(model, name, store, factory)
}

fn eager_visited<M: Model, R: Model>(
    model: &mut M,
    _name: &str,
    store: &mut RelationStore<'_, M>,
    factory: RelationFactory<M, R>,
) -> OrmResult<()> {
    let state = store.state();
    match &mut store.payload {
        StorePayload::EagerLoad {
            with,
            builder,
            models,
        } => builder.eager_load_relation_visited::<R>(factory, model, *with, &mut **models),
        _ => Err(payload_mismatch(RelationStoreState::EagerLoading, state)),
    }
}

fn push_visited<M: Model, R: Model>(
    _model: &mut M,
    name: &str,
    store: &mut RelationStore<'_, M>,
    _factory: RelationFactory<M, R>,
) -> OrmResult<()> {
    let state = store.state();
    let (value, result) = match &mut store.payload {
        StorePayload::Push { value, result } => (value, result),
        _ => return Err(payload_mismatch(RelationStoreState::Pushing, state)),
    };

    *result = if value.is_many() {
        let related = value
            .as_many_mut::<R>()
            .ok_or_else(|| loaded_type_mismatch::<M, R>(name))?;
        push_many(related)?
    } else {
        match value.as_one_mut::<R>() {
            Some(Some(related)) => related.push()?,
            Some(None) => true,
            None => return Err(loaded_type_mismatch::<M, R>(name)),
        }
    };
    Ok(())
}

/// Push every model, stopping at the first failure
fn push_many<R: Model>(related: &mut [R]) -> OrmResult<bool> {
    for model in related.iter_mut() {
        if !model.push()? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn touch_owners_visited<M: Model, R: Model>(
    model: &mut M,
    name: &str,
    store: &mut RelationStore<'_, M>,
    factory: RelationFactory<M, R>,
) -> OrmResult<()> {
    if !matches!(store.payload, StorePayload::TouchOwners) {
        return Err(payload_mismatch(RelationStoreState::TouchingOwners, store.state()));
    }

    let relation = factory(model);
    let touched = relation.touch()?;
    tracing::debug!(
        "Touched {} '{}' owner row(s) of {}",
        touched,
        name,
        M::model_name()
    );

    if !model.relation_loaded(name) {
        let value = relation.get_results()?;
        model.set_relation(name, value);
    }

    match relation.kind() {
        RelationKind::Many => {
            for related in model.get_relation_mut::<R>(name)?.iter_mut() {
                related.touch_owners()?;
            }
        }
        RelationKind::One => {
            if let Some(related) = model.get_relation_one_mut::<R>(name)? {
                related.touch_owners()?;
            }
        }
    }
    Ok(())
}

/// Build the `IN (SELECT ...)` clause of a `has()` on this relation.
///
/// A dotted request recurses into the related model, the outer relation then
/// only has to exist.
fn existence_visited<M: Model, R: Model>(
    model: &mut M,
    name: &str,
    store: &mut RelationStore<'_, M>,
    factory: RelationFactory<M, R>,
) -> OrmResult<()> {
    let state = store.state();
    let (request, clause) = match &mut store.payload {
        StorePayload::QueryRelationships { request, clause } => (request, clause),
        _ => return Err(payload_mismatch(RelationStoreState::QueryingRelationships, state)),
    };
    let request = request
        .take()
        .ok_or_else(|| ModelError::RelationStore("existence request already used".to_string()))?;

    let relation = eager_relation(factory, model);
    let (parent_column, related_column) = relation.existence_keys();
    let mut related = relation.query().clone();

    let (operator, count) = match request.nested {
        Some(nested) => {
            related = related.has_constrained(
                &nested,
                request.operator,
                request.count,
                request.constraint,
                WhereBoolean::And,
            )?;
            (QueryOperator::GreaterThanOrEqual, 1)
        }
        None => {
            if let Some(constraint) = request.constraint {
                let constraint = constraint
                    .downcast::<HasConstraint<R>>()
                    .map_err(|_| constraint_type_mismatch::<M, R>(name))?;
                related = (*constraint)(related);
            }
            (request.operator, request.count)
        }
    };

    tracing::debug!(
        "Existence clause on '{}' of {}: count {} {}",
        name,
        M::model_name(),
        operator,
        count
    );
    *clause = Some(ExistenceClause::new(
        parent_column,
        related.to_base(),
        &related_column,
        operator,
        count,
    ));
    Ok(())
}

fn constraint_type_mismatch<M: Model, R: Model>(name: &str) -> ModelError {
    ModelError::RelationMapping {
        model: M::model_name().to_string(),
        relation: name.to_string(),
        expected: "a constraint of another model".to_string(),
        registered: std::any::type_name::<R>().to_string(),
    }
}

fn loaded_type_mismatch<M: Model, R: Model>(name: &str) -> ModelError {
    ModelError::RelationMapping {
        model: M::model_name().to_string(),
        relation: name.to_string(),
        expected: std::any::type_name::<R>().to_string(),
        registered: "a different loaded value".to_string(),
    }
}

/// Build a relation from a template without its lazy constraints
pub(crate) fn eager_relation<M: Model, R: Model>(
    factory: RelationFactory<M, R>,
    template: &M,
) -> Box<dyn Relation<M, R>> {
    no_constraints(|| factory(template))
}
