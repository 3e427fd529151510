//! Core Model Trait - Base definition for database entities
//!
//! Defines the fundamental Model trait: table metadata, primary key handling,
//! timestamp configuration, declared relations and connection selection.
//! Behavior lives in the extension traits of the sibling modules, each
//! implemented for every `Model`.

use std::any::type_name;
use std::fmt::Debug;
use std::sync::Arc;

use super::base::BaseModel;
use crate::backends::{Connection, Row};
use crate::connection::{resolve_connection, ConnectionResolver};
use crate::error::OrmResult;
use crate::relationships::{registry_for, RelationRegistry};
use crate::tiny_builder::TinyBuilder;

/// Core trait for database models
pub trait Model: Clone + Debug + Default + Send + Sync + 'static {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key field name, empty for a model without a key
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Whether the primary key is generated by the database
    fn incrementing() -> bool {
        true
    }

    /// Sequence passed to `insert_get_id`, defaults to the key column
    fn key_sequence() -> Option<&'static str> {
        None
    }

    /// Check if this model uses timestamps (created_at, updated_at)
    fn uses_timestamps() -> bool {
        true
    }

    fn created_at_column() -> &'static str {
        "created_at"
    }

    fn updated_at_column() -> &'static str {
        "updated_at"
    }

    /// Storage format for date columns, the connection's grammar format
    /// when `None`
    fn date_format() -> Option<&'static str> {
        None
    }

    /// Whether removing a model stamps `deleted_at` instead of deleting
    /// the row
    fn soft_deletes() -> bool {
        false
    }

    fn deleted_at_column() -> &'static str {
        "deleted_at"
    }

    /// Attributes `fill()` may assign, every attribute when empty and
    /// nothing is guarded
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    /// Attributes `fill()` skips, `["*"]` guards everything not fillable
    fn guarded() -> &'static [&'static str] {
        &[]
    }

    /// Date columns besides the timestamps
    fn dates() -> &'static [&'static str] {
        &[]
    }

    /// Relations whose owners are touched when this model is saved
    fn touches() -> &'static [&'static str] {
        &[]
    }

    /// Relations eager loaded by every query of this model
    fn default_with() -> &'static [&'static str] {
        &[]
    }

    /// Connection used by this model type, the resolver default when `None`
    fn connection_name() -> Option<&'static str> {
        None
    }

    /// Declare the relations of this model type
    fn register_relations(_relations: &mut RelationRegistry<Self>) {}

    fn base(&self) -> &BaseModel;

    fn base_mut(&mut self) -> &mut BaseModel;

    /// Short type name used in errors and logs
    fn model_name() -> &'static str {
        let full = type_name::<Self>();
        let path = full.split('<').next().unwrap_or(full);
        path.rsplit("::").next().unwrap_or(path)
    }

    fn relation_registry() -> OrmResult<&'static RelationRegistry<Self>> {
        registry_for::<Self>()
    }

    /// Whether the instance corresponds to a persisted row
    fn exists(&self) -> bool {
        self.base().exists
    }

    fn set_exists(&mut self, exists: bool) -> &mut Self {
        self.base_mut().exists = exists;
        self
    }

    /// A blank instance on the same connection
    fn new_instance(&self) -> Self {
        let mut model = Self::default();
        model.base_mut().connection = self.base().connection.clone();
        model.base_mut().resolver = self.base().resolver.clone();
        model
    }

    /// An existing instance from a database row, attributes and original
    /// both set to the row
    fn new_from_builder(&self, row: Row) -> Self {
        let mut model = self.new_instance();
        let base = model.base_mut();
        base.original = row.clone();
        base.attributes = row;
        base.exists = true;
        model
    }

    fn get_connection_name(&self) -> Option<String> {
        self.base()
            .connection
            .clone()
            .or_else(|| Self::connection_name().map(str::to_string))
    }

    fn set_connection(&mut self, name: &str) -> &mut Self {
        self.base_mut().connection = Some(name.to_string());
        self
    }

    fn get_resolver(&self) -> Option<&Arc<dyn ConnectionResolver>> {
        self.base().resolver.as_ref()
    }

    /// Resolve connections through `resolver` instead of the global one
    fn set_resolver(&mut self, resolver: Arc<dyn ConnectionResolver>) -> &mut Self {
        self.base_mut().resolver = Some(resolver);
        self
    }

    fn get_connection(&self) -> OrmResult<Arc<dyn Connection>> {
        let name = self.get_connection_name();
        resolve_connection(self.get_resolver(), name.as_deref())
    }

    /// Builder for this model with the default eager loads applied
    fn new_query(&self) -> TinyBuilder<Self> {
        self.new_query_without_relationships()
            .with_defaults(Self::default_with())
    }

    fn new_query_without_relationships(&self) -> TinyBuilder<Self> {
        TinyBuilder::new(self.new_instance())
    }
}

/// `TorrentPreviewableFile` → `torrent_previewable_file`
pub fn snake_case(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;

    for ch in name.chars() {
        if ch.is_uppercase() {
            if previous_lower {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
            previous_lower = false;
        } else {
            previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
            snake.push(ch);
        }
    }
    snake
}
