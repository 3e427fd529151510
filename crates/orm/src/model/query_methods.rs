//! Query Methods - static entry points that start a [`TinyBuilder`]
//!
//! `Torrent::find(4)`, `Torrent::with(["torrentFiles"])?.get()` and friends
//! build on a blank instance of the model type, so they resolve the
//! connection through the model's `connection_name()` and the global
//! resolver. Use [`QueryMethods::on`] to inject a resolver instead.

use std::sync::Arc;

use super::core_trait::Model;
use super::crud_operations::CrudOperations;
use crate::backends::{AttributeItem, Value};
use crate::connection::ConnectionResolver;
use crate::error::OrmResult;
use crate::tiny_builder::{TinyBuilder, WithItem};

/// Trait providing query operations for model collections
pub trait QueryMethods: Model {
    /// Get a query builder for this model
    fn query() -> TinyBuilder<Self> {
        Self::default().new_query()
    }

    /// Query through an explicit connection resolver
    fn on(resolver: Arc<dyn ConnectionResolver>) -> TinyBuilder<Self> {
        let mut model = Self::default();
        model.set_resolver(resolver);
        model.new_query()
    }

    /// Query a named connection of the resolver
    fn on_connection(name: &str) -> TinyBuilder<Self> {
        let mut model = Self::default();
        model.set_connection(name);
        model.new_query()
    }

    fn all() -> OrmResult<Vec<Self>> {
        Self::query().get()
    }

    fn find<K: Into<Value>>(id: K) -> OrmResult<Option<Self>> {
        Self::query().find(id)
    }

    fn find_or_fail<K: Into<Value>>(id: K) -> OrmResult<Self> {
        Self::query().find_or_fail(id)
    }

    fn find_or_new<K: Into<Value>>(id: K) -> OrmResult<Self> {
        Self::query().find_or_new(id)
    }

    fn find_many<K: Into<Value>>(ids: Vec<K>) -> OrmResult<Vec<Self>> {
        Self::query().find_many(ids)
    }

    fn first() -> OrmResult<Option<Self>> {
        Self::query().first()
    }

    fn first_or_fail() -> OrmResult<Self> {
        Self::query().first_or_fail()
    }

    fn first_where<V: Into<Value>>(column: &str, operator: &str, value: V) -> OrmResult<Option<Self>> {
        Self::query().first_where(column, operator, value)
    }

    fn where_eq<V: Into<Value>>(column: &str, value: V) -> TinyBuilder<Self> {
        Self::query().where_eq(column, value)
    }

    fn where_in<V: Into<Value>>(column: &str, values: Vec<V>) -> TinyBuilder<Self> {
        Self::query().where_in(column, values)
    }

    /// Query including soft deleted rows
    fn with_trashed() -> TinyBuilder<Self> {
        Self::query().with_trashed()
    }

    /// Query of the soft deleted rows only
    fn only_trashed() -> TinyBuilder<Self> {
        Self::query().only_trashed()
    }

    /// Start a query eager loading `relations`
    fn with<I, T>(relations: I) -> OrmResult<TinyBuilder<Self>>
    where
        I: IntoIterator<Item = T>,
        T: Into<WithItem>,
    {
        Self::query().with(relations)
    }

    /// Start a query without some of the default eager loads
    fn without(relations: &[&str]) -> TinyBuilder<Self> {
        Self::query().without(relations)
    }

    /// Create and save a model
    fn create<I, T>(attributes: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        Self::query().create(attributes)
    }

    /// Remove the models with the given keys one by one, returns how many
    /// were removed
    fn destroy<K: Into<Value>>(ids: Vec<K>) -> OrmResult<u64> {
        let mut count = 0;
        for mut model in Self::find_many(ids)? {
            if model.remove()? {
                count += 1;
            }
        }
        Ok(count)
    }
}

// Implement QueryMethods for all types that implement Model
impl<T: Model> QueryMethods for T {}
