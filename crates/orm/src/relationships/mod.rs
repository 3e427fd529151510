//! Relationships Module - relation types, the per model registry and the
//! visitor dispatch used for eager loading, push and touch owners

pub mod traits;
pub mod has_one_or_many;
pub mod has_one;
pub mod has_many;
pub mod belongs_to;
pub mod belongs_to_many;

pub mod registry;
pub mod value;

// Relation store and dispatch
pub mod store;
pub mod dispatch;
pub mod constraints;

// Re-export main types
pub use traits::{Relation, RelationKind};
pub use has_one_or_many::HasOneOrMany;
pub use has_one::HasOne;
pub use has_many::HasMany;
pub use belongs_to::BelongsTo;
pub use belongs_to_many::{BelongsToMany, SyncChanges};

pub use registry::{registry_for, RelationFactory, RelationRegistry};
pub use value::{AnyRelated, RelationValue};

pub use store::{
    ExistenceClause, ExistenceRequest, RelationStore, RelationStoreState, StoreGuard, StoreSlot,
};
pub use dispatch::{visit_relation, VisitFn};
pub use constraints::{constraints_enabled, no_constraints};
