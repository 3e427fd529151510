//! # tinyorm: Active record ORM
//!
//! Models carry their attributes with dirty tracking, declare relations in a
//! per type registry and are queried through a model aware builder that eager
//! loads nested relations in one query per level.
//!
//! This crate provides the Model traits, the TinyBuilder, relation types and
//! the relation store dispatch, plus the query and connection layers they run
//! on: a PostgreSQL connection over sqlx and, behind the `memory` feature,
//! an in-memory connection.

pub mod error;
pub mod backends;
pub mod query;
pub mod connection;
pub mod model;
pub mod relationships;
pub mod tiny_builder;

// Re-export core traits and types
pub use error::*;
pub use backends::{
    attributes, AttributeItem, Connection, PostgresConnection, Row, StatementResult, Value,
};
#[cfg(any(test, feature = "memory"))]
pub use backends::{InjectedFailure, LoggedQuery, MemoryConnection, StatementKind};
pub use query::{QueryBuilder, QueryGrammar};
pub use connection::{
    connection_resolver, set_connection_resolver, unset_connection_resolver, ConnectionResolver,
    DatabaseManager,
};
pub use model::*;
pub use relationships::{
    no_constraints, BelongsTo, BelongsToMany, HasMany, HasOne, Relation, RelationKind,
    RelationRegistry, RelationStoreState, RelationValue, SyncChanges,
};
pub use tiny_builder::{HasConstraint, TinyBuilder, TrashedScope, WithItem};

/// Everything needed to declare and use models
pub mod prelude {
    pub use crate::backends::{attributes, AttributeItem, Value};
    pub use crate::error::{ModelError, OrmResult};
    pub use crate::model::{
        BaseModel, CrudOperations, FullModel, GuardsAttributes, HasAttributes, HasRelations,
        HasTimestamps, Model, QueryMethods, SaveOptions, SoftDeletes,
    };
    pub use crate::relationships::{Relation, RelationRegistry, RelationValue};
    pub use crate::tiny_builder::{TinyBuilder, TrashedScope, WithItem};
}
