//! Relation store
//!
//! A store is created right before a named relation is visited and carries
//! the payload of exactly one operation: eager loading, pushing, touching
//! owners or building a relationship existence clause. Every model instance owns a [`StoreSlot`] recording which
//! operation is running on it; [`StoreGuard`] claims the slot for the length
//! of one visit and releases it on every exit path.

use std::any::Any;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::value::RelationValue;
use crate::error::{ModelError, OrmResult};
use crate::model::Model;
use crate::query::{QueryBuilder, QueryOperator, WhereBoolean};
use crate::tiny_builder::{TinyBuilder, WithItem};

/// Operation currently running on a model's relations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelationStoreState {
    Idle = 0,
    EagerLoading = 1,
    Pushing = 2,
    TouchingOwners = 3,
    QueryingRelationships = 4,
}

impl RelationStoreState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RelationStoreState::EagerLoading,
            2 => RelationStoreState::Pushing,
            3 => RelationStoreState::TouchingOwners,
            4 => RelationStoreState::QueryingRelationships,
            _ => RelationStoreState::Idle,
        }
    }
}

/// Per instance record of the running relation operation.
///
/// Cloning a model never shares its slot; the clone starts `Idle`.
#[derive(Debug, Default)]
pub struct StoreSlot(Arc<AtomicU8>);

impl Clone for StoreSlot {
    fn clone(&self) -> Self {
        StoreSlot::default()
    }
}

impl StoreSlot {
    pub fn state(&self) -> RelationStoreState {
        RelationStoreState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Claims a [`StoreSlot`] for one visit, resets it to `Idle` when dropped
#[derive(Debug)]
pub struct StoreGuard {
    slot: Arc<AtomicU8>,
}

impl StoreGuard {
    pub fn enter(slot: &StoreSlot, state: RelationStoreState) -> OrmResult<Self> {
        if state == RelationStoreState::Idle {
            return Err(ModelError::RelationStore(
                "cannot enter the Idle state".to_string(),
            ));
        }

        slot.0
            .compare_exchange(
                RelationStoreState::Idle as u8,
                state as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| {
                ModelError::RelationStore(format!(
                    "cannot enter {:?}, the store is busy with {:?}",
                    state,
                    RelationStoreState::from_u8(current)
                ))
            })?;

        Ok(Self {
            slot: Arc::clone(&slot.0),
        })
    }
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        self.slot.store(RelationStoreState::Idle as u8, Ordering::Release);
    }
}

/// Operation payload carried by a [`RelationStore`]
pub enum StorePayload<'a, M: Model> {
    EagerLoad {
        with: &'a WithItem,
        builder: &'a TinyBuilder<M>,
        models: &'a mut Vec<M>,
    },
    Push {
        value: &'a mut RelationValue,
        result: bool,
    },
    TouchOwners,
    QueryRelationships {
        request: Option<ExistenceRequest>,
        clause: Option<ExistenceClause>,
    },
}

/// What `has()` asks of one relation
pub struct ExistenceRequest {
    pub operator: QueryOperator,
    pub count: i64,
    /// Rest of a dotted relation name, resolved on the related model
    pub nested: Option<String>,
    /// A `HasConstraint<R>` for the innermost related type
    pub constraint: Option<Box<dyn Any>>,
}

/// `column IN (subquery)`, or `NOT IN` when zero related rows satisfy the
/// count
#[derive(Debug, Clone)]
pub struct ExistenceClause {
    pub column: String,
    pub subquery: QueryBuilder,
    pub negated: bool,
}

impl ExistenceClause {
    /// Parents whose `related_column` count in `related` satisfies
    /// `operator count`
    pub fn new(
        parent_column: String,
        related: QueryBuilder,
        related_column: &str,
        operator: QueryOperator,
        count: i64,
    ) -> Self {
        let negated = operator.compare_counts(0, count);
        let operator = if negated { operator.negate() } else { operator };

        let mut subquery = related
            .wrap_wheres()
            .where_not_null(related_column)
            .select(related_column);
        let plain_existence = matches!(
            (operator, count),
            (QueryOperator::GreaterThanOrEqual, 1) | (QueryOperator::GreaterThan, 0)
        );
        if !plain_existence {
            subquery = subquery.group_by(related_column).having_count(operator, count);
        }

        Self {
            column: parent_column,
            subquery,
            negated,
        }
    }

    /// Add the clause to `query`, a negated clause also keeps parents
    /// without a key
    pub fn apply(self, query: QueryBuilder, boolean: WhereBoolean) -> QueryBuilder {
        let Self {
            column,
            subquery,
            negated,
        } = self;

        match (negated, boolean) {
            (false, WhereBoolean::And) => query.where_in_sub(&column, subquery),
            (false, WhereBoolean::Or) => query.or_where_in_sub(&column, subquery),
            (true, WhereBoolean::And) => {
                query.where_nested(|q| q.where_not_in_sub(&column, subquery).or_where_null(&column))
            }
            (true, WhereBoolean::Or) => {
                query.or_where_nested(|q| q.where_not_in_sub(&column, subquery).or_where_null(&column))
            }
        }
    }
}

/// Transient store handed to the relation visitor
pub struct RelationStore<'a, M: Model> {
    state: RelationStoreState,
    pub(crate) payload: StorePayload<'a, M>,
}

impl<'a, M: Model> RelationStore<'a, M> {
    pub fn eager(with: &'a WithItem, builder: &'a TinyBuilder<M>, models: &'a mut Vec<M>) -> Self {
        Self {
            state: RelationStoreState::EagerLoading,
            payload: StorePayload::EagerLoad {
                with,
                builder,
                models,
            },
        }
    }

    pub fn push(value: &'a mut RelationValue) -> Self {
        Self {
            state: RelationStoreState::Pushing,
            payload: StorePayload::Push {
                value,
                result: false,
            },
        }
    }

    pub fn touch_owners() -> Self {
        Self {
            state: RelationStoreState::TouchingOwners,
            payload: StorePayload::TouchOwners,
        }
    }

    pub fn query_relationships(request: ExistenceRequest) -> Self {
        Self {
            state: RelationStoreState::QueryingRelationships,
            payload: StorePayload::QueryRelationships {
                request: Some(request),
                clause: None,
            },
        }
    }

    pub fn state(&self) -> RelationStoreState {
        self.state
    }

    /// Clause built by the existence handler
    pub fn take_existence_clause(&mut self) -> Option<ExistenceClause> {
        match &mut self.payload {
            StorePayload::QueryRelationships { clause, .. } => clause.take(),
            _ => None,
        }
    }

    /// Outcome recorded by the push handler, `false` for other stores
    pub fn push_result(&self) -> bool {
        match self.payload {
            StorePayload::Push { result, .. } => result,
            _ => false,
        }
    }
}

/// Error for a handler that received a store of another state
pub(crate) fn payload_mismatch(expected: RelationStoreState, actual: RelationStoreState) -> ModelError {
    tracing::error!(
        "Relation store payload mismatch: expected {:?}, store is {:?}",
        expected,
        actual
    );
    ModelError::RelationStore(format!("expected a {:?} store, got {:?}", expected, actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_resets_slot_on_drop() {
        let slot = StoreSlot::default();
        {
            let _guard = StoreGuard::enter(&slot, RelationStoreState::Pushing).unwrap();
            assert_eq!(slot.state(), RelationStoreState::Pushing);
        }
        assert_eq!(slot.state(), RelationStoreState::Idle);
    }

    #[test]
    fn test_busy_slot_is_rejected() {
        let slot = StoreSlot::default();
        let _guard = StoreGuard::enter(&slot, RelationStoreState::EagerLoading).unwrap();

        let result = StoreGuard::enter(&slot, RelationStoreState::TouchingOwners);
        assert!(matches!(result, Err(ModelError::RelationStore(_))));
        assert_eq!(slot.state(), RelationStoreState::EagerLoading);
    }

    #[test]
    fn test_guard_resets_slot_on_error_path() {
        fn failing_visit(slot: &StoreSlot) -> OrmResult<()> {
            let _guard = StoreGuard::enter(slot, RelationStoreState::TouchingOwners)?;
            Err(ModelError::Database("boom".into()))
        }

        let slot = StoreSlot::default();
        assert!(failing_visit(&slot).is_err());
        assert_eq!(slot.state(), RelationStoreState::Idle);
    }

    #[test]
    fn test_cloned_slot_starts_idle() {
        let slot = StoreSlot::default();
        let _guard = StoreGuard::enter(&slot, RelationStoreState::Pushing).unwrap();
        assert_eq!(slot.clone().state(), RelationStoreState::Idle);
    }

    #[test]
    fn test_existence_clause_counts() {
        let related = QueryBuilder::table("torrent_files");
        let column = "torrent_files.torrent_id";

        let exists = ExistenceClause::new("torrents.id".into(), related.clone(), column, QueryOperator::GreaterThanOrEqual, 1);
        assert!(!exists.negated);
        assert!(exists.subquery.get_groups().is_empty());

        let at_least_two = ExistenceClause::new("torrents.id".into(), related.clone(), column, QueryOperator::GreaterThanOrEqual, 2);
        assert!(!at_least_two.negated);
        assert_eq!(at_least_two.subquery.get_groups(), [column.to_string()]);
        assert_eq!(
            at_least_two.subquery.get_having_count(),
            Some(&(QueryOperator::GreaterThanOrEqual, 2))
        );

        let missing = ExistenceClause::new("torrents.id".into(), related.clone(), column, QueryOperator::LessThan, 1);
        assert!(missing.negated);
        assert!(missing.subquery.get_having_count().is_none());

        let at_most_one = ExistenceClause::new("torrents.id".into(), related, column, QueryOperator::LessThanOrEqual, 1);
        assert!(at_most_one.negated);
        assert_eq!(
            at_most_one.subquery.get_having_count(),
            Some(&(QueryOperator::GreaterThan, 1))
        );
    }

    #[test]
    fn test_entering_idle_is_rejected() {
        let slot = StoreSlot::default();
        assert!(StoreGuard::enter(&slot, RelationStoreState::Idle).is_err());
    }
}
