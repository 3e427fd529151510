//! CRUD Operations - save, update, remove and touch for model instances
//!
//! Statements that fail in the driver are reported as `Ok(false)` and logged;
//! an `Err` from these methods means the model definition or the call site is
//! wrong.

use super::attributes::HasAttributes;
use super::core_trait::Model;
use super::relations::HasRelations;
use super::timestamps::HasTimestamps;
use crate::backends::AttributeItem;
use crate::error::{ModelError, OrmResult};
use crate::query::QueryBuilder;

/// Options for [`CrudOperations::save_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Touch the owners declared in `touches()` after a dirty save
    pub touch: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { touch: true }
    }
}

/// Trait providing CRUD operations for models
pub trait CrudOperations: Model {
    fn save(&mut self) -> OrmResult<bool> {
        self.save_with(SaveOptions::default())
    }

    /// Insert a new row or update the dirty attributes of an existing one
    fn save_with(&mut self, options: SaveOptions) -> OrmResult<bool> {
        let saved = if self.exists() {
            if self.is_dirty(&[]) {
                let result = self.perform_update();
                persisted::<Self>(result, "update")?
            } else {
                true
            }
        } else {
            let result = self.perform_insert();
            persisted::<Self>(result, "insert")?
        };

        if !saved {
            return Ok(false);
        }
        self.finish_save(options)
    }

    /// Insert the attributes as a new row.
    ///
    /// Incrementing models take the generated id as their key, an id of `0`
    /// is a failed insert.
    fn perform_insert(&mut self) -> OrmResult<bool> {
        if Self::uses_timestamps() {
            self.update_timestamps()?;
        }

        let connection = self.get_connection()?;
        let query = QueryBuilder::table(Self::table_name());
        let attributes = self.attributes_for_binding(self.get_attributes());

        if Self::incrementing() {
            let key_name = Self::primary_key_name();
            let sequence = Self::key_sequence().unwrap_or(key_name);
            let id = connection.insert_get_id(&query, &attributes, Some(sequence))?;
            if id == 0 {
                tracing::warn!("Insert into '{}' returned no id", Self::table_name());
                return Ok(false);
            }
            if !key_name.is_empty() {
                self.set_attribute(key_name, id)?;
            }
        } else {
            if attributes.is_empty() {
                return Ok(true);
            }
            connection.insert(&query, &attributes)?;
        }

        self.set_exists(true);
        Ok(true)
    }

    /// Update the dirty attributes, keyed by the original primary key
    fn perform_update(&mut self) -> OrmResult<bool> {
        if Self::uses_timestamps() {
            self.update_timestamps()?;
        }

        let dirty = self.get_dirty();
        if dirty.is_empty() {
            return Ok(true);
        }

        let query = self.set_keys_for_save_query()?;
        let bindings = self.attributes_for_binding(&dirty);
        let result = self.get_connection()?.update(&query, &bindings)?;
        tracing::debug!(
            "Updated {} row(s) of '{}' with {} dirty attribute(s)",
            result.affected_rows,
            Self::table_name(),
            dirty.len()
        );

        self.sync_changes();
        Ok(true)
    }

    /// Query matching this row by the key it was loaded with
    fn set_keys_for_save_query(&self) -> OrmResult<QueryBuilder> {
        let key = self
            .get_raw_original(Self::primary_key_name())
            .or_else(|| self.get_key())
            .filter(|key| !key.is_null())
            .cloned()
            .ok_or(ModelError::MissingPrimaryKey)?;

        Ok(QueryBuilder::table(Self::table_name()).where_eq(&self.get_qualified_key_name(), key))
    }

    /// Touch owners after a dirty save and sync the original.
    ///
    /// A failed touch reports `false` and leaves the attributes dirty, the
    /// row itself stays written.
    fn finish_save(&mut self, options: SaveOptions) -> OrmResult<bool> {
        if options.touch && self.is_dirty(&[]) {
            let result = self.touch_owners();
            if !persisted::<Self>(result.map(|_| true), "touch owners")? {
                return Ok(false);
            }
        }
        self.sync_original();
        Ok(true)
    }

    /// Fill and save an existing model, `false` for a model without a row
    fn update<I, T>(&mut self, attributes: I) -> OrmResult<bool>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        if !self.exists() {
            return Ok(false);
        }
        self.fill(attributes)?;
        self.save()
    }

    /// Delete the row, or stamp `deleted_at` on a soft deleting model.
    ///
    /// The affected row count is not checked, removing an already deleted
    /// row still reports success.
    fn remove(&mut self) -> OrmResult<bool> {
        self.perform_remove(false)
    }

    /// Shared body of `remove` and `force_delete`
    fn perform_remove(&mut self, force: bool) -> OrmResult<bool> {
        if Self::primary_key_name().is_empty() {
            tracing::error!("Model '{}' has no primary key name", Self::model_name());
            return Err(ModelError::MissingKeyName(Self::model_name().to_string()));
        }
        if !self.exists() {
            return Ok(false);
        }

        let touched = self.touch_owners();
        if !persisted::<Self>(touched.map(|_| true), "touch owners")? {
            return Ok(false);
        }

        if Self::soft_deletes() && !force {
            return self.run_soft_delete();
        }

        let query = self.set_keys_for_save_query()?;
        let deleted = self
            .get_connection()?
            .delete(&query)
            .map(|_| true);
        if !persisted::<Self>(deleted, "delete")? {
            return Ok(false);
        }

        self.set_exists(false);
        Ok(true)
    }

    /// Write `deleted_at`, and `updated_at` when managed, the model keeps
    /// existing
    fn run_soft_delete(&mut self) -> OrmResult<bool> {
        let time = self.fresh_timestamp();
        let mut columns = vec![Self::deleted_at_column()];
        self.set_attribute(Self::deleted_at_column(), time)?;

        let updated_at = Self::updated_at_column();
        if Self::uses_timestamps() && !updated_at.is_empty() {
            self.set_updated_at(time)?;
            columns.push(updated_at);
        }

        let query = self.set_keys_for_save_query()?;
        let values = self.attributes_for_binding(&self.only(&columns));
        let updated = self
            .get_connection()?
            .update(&query, &values)
            .map(|_| true);
        if !persisted::<Self>(updated, "soft delete")? {
            return Ok(false);
        }

        for column in columns {
            self.sync_original_attribute(column);
        }
        Ok(true)
    }

    /// Alias of [`CrudOperations::remove`]
    fn delete(&mut self) -> OrmResult<bool> {
        self.remove()
    }

    /// Save with a fresh `updated_at` and nothing else changed
    fn touch(&mut self) -> OrmResult<bool> {
        if !Self::uses_timestamps() {
            return Ok(false);
        }
        self.update_timestamps()?;
        self.save()
    }

    /// Reload this row into a new instance, `None` when it no longer exists
    fn fresh(&self, relations: &[&str]) -> OrmResult<Option<Self>> {
        if !self.exists() {
            return Ok(None);
        }
        let Some(key) = self.get_key().cloned() else {
            return Ok(None);
        };

        self.new_query_without_relationships()
            .with(relations.iter().copied())?
            .where_eq(&self.get_qualified_key_name(), key)
            .first()
    }

    /// Reload attributes and loaded relations in place
    fn refresh(&mut self) -> OrmResult<&mut Self> {
        if !self.exists() {
            return Ok(self);
        }
        let key = self.get_key().cloned().ok_or(ModelError::MissingPrimaryKey)?;

        let fresh = self
            .new_query_without_relationships()
            .where_eq(&self.get_qualified_key_name(), key)
            .first_or_fail()?;
        self.set_raw_attributes(fresh.get_attributes().to_vec(), true);

        let mut loaded: Vec<String> = self.get_relations().keys().cloned().collect();
        loaded.sort();
        let loaded: Vec<&str> = loaded.iter().map(String::as_str).collect();
        self.load(&loaded)?;
        Ok(self)
    }

    /// A non-existing copy without the key, the timestamps and `except`
    fn replicate(&self, except: &[&str]) -> Self {
        let mut excluded = vec![Self::primary_key_name()];
        if Self::uses_timestamps() {
            excluded.push(Self::created_at_column());
            excluded.push(Self::updated_at_column());
        }
        excluded.extend_from_slice(except);

        let mut model = self.new_instance();
        let attributes = self
            .get_attributes()
            .iter()
            .filter(|item| !excluded.contains(&item.key.as_str()))
            .cloned()
            .collect();
        model.set_raw_attributes(attributes, false);
        model.base_mut().relations = self.base().relations.clone();
        model
    }

    /// Same table, same connection and the same key
    fn is(&self, other: &Self) -> bool {
        let same_key = match (self.get_key(), other.get_key()) {
            (Some(a), Some(b)) => a.key_string().is_some() && a.key_string() == b.key_string(),
            _ => false,
        };
        same_key && self.get_connection_name() == other.get_connection_name()
    }

    fn is_not(&self, other: &Self) -> bool {
        !self.is(other)
    }
}

// Implement CrudOperations for all types that implement Model
impl<T: Model> CrudOperations for T {}

/// Map a statement failure to `Ok(false)`, keep every other error
pub(crate) fn persisted<M: Model>(result: OrmResult<bool>, action: &str) -> OrmResult<bool> {
    match result {
        Err(err) if err.is_persistence_failure() => {
            tracing::warn!("{} of '{}' failed: {}", action, M::model_name(), err);
            Ok(false)
        }
        other => other,
    }
}
