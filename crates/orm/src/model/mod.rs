//! Model System - Modular model trait system for database entities
//!
//! This module provides a decomposed model system with focused traits for
//! different aspects of model functionality:
//!
//! - `core_trait`: Core Model trait definition
//! - `base`: Row state embedded in every model
//! - `attributes`: Attribute store and dirty tracking
//! - `guards`: Mass assignment guards for `fill()`
//! - `timestamps`: `created_at` / `updated_at` management
//! - `crud_operations`: save, update, remove, touch
//! - `soft_deletes`: `deleted_at` stamping, restore and force delete
//! - `query_methods`: Static query entry points
//! - `relations`: Relation access, push and touch owners

pub mod core_trait;
pub mod base;
pub mod attributes;
pub mod guards;
pub mod timestamps;
pub mod crud_operations;
pub mod soft_deletes;
pub mod query_methods;
pub mod relations;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export main types and traits for convenience
pub use core_trait::{snake_case, Model};
pub use base::BaseModel;
pub use attributes::{has_changes, parse_date_time, HasAttributes};
pub use guards::{unguarded, GuardsAttributes};
pub use timestamps::HasTimestamps;
pub use crud_operations::{CrudOperations, SaveOptions};
pub use soft_deletes::SoftDeletes;
pub use query_methods::QueryMethods;
pub use relations::{joining_table, HasRelations};

// Re-export all traits in a single composite trait for easy importing
/// Composite trait that includes all model functionality
pub trait FullModel: Model + HasAttributes + HasTimestamps + CrudOperations + QueryMethods + HasRelations {}

// Implement FullModel for all types that implement the component traits
impl<T> FullModel for T
where
    T: Model + HasAttributes + HasTimestamps + CrudOperations + QueryMethods + HasRelations
{}
