//! BelongsToMany Relationship - many to many through a pivot table
//!
//! The related query always joins the pivot table. Pivot columns are selected
//! under a `pivot_` prefix and moved out of the related model's attributes
//! into its pivot attribute set during hydration.

use std::marker::PhantomData;

use super::constraints::constraints_enabled;
use super::traits::{collect_keys, model_key, Relation, RelationKind};
use super::value::RelationValue;
use crate::backends::{AttributeItem, Value};
use crate::error::OrmResult;
use crate::model::{HasAttributes, HasTimestamps, Model};
use crate::query::{qualify, QueryBuilder};
use crate::tiny_builder::TinyBuilder;

const PIVOT_PREFIX: &str = "pivot_";

/// Related ids changed by [`BelongsToMany::sync`] and
/// [`BelongsToMany::toggle`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncChanges {
    pub attached: Vec<Value>,
    pub detached: Vec<Value>,
    pub updated: Vec<Value>,
}

impl SyncChanges {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty() && self.updated.is_empty()
    }
}

pub struct BelongsToMany<M: Model, R: Model> {
    query: TinyBuilder<R>,
    related: R,
    table: String,
    foreign_pivot_key: String,
    related_pivot_key: String,
    parent_key: String,
    related_key: String,
    parent_key_value: Value,
    pivot_columns: Vec<String>,
    with_timestamps: bool,
    _parent: PhantomData<fn() -> M>,
}

impl<M: Model, R: Model> BelongsToMany<M, R> {
    pub fn new(
        parent: &M,
        related: R,
        table: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        parent_key: String,
        related_key: String,
    ) -> Self {
        let parent_key_value = parent.get_attribute(&parent_key).cloned().unwrap_or_default();
        let mut query = related.new_query();

        let related_column = qualify(R::table_name(), &related_key);
        let pivot_related = qualify(&table, &related_pivot_key);
        query.apply(|q| q.join(&table, &related_column, &pivot_related));

        if constraints_enabled() {
            let pivot_foreign = qualify(&table, &foreign_pivot_key);
            let key = parent_key_value.clone();
            query.apply(|q| q.where_eq(&pivot_foreign, key));
        }

        Self {
            query,
            related,
            table,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            related_key,
            parent_key_value,
            pivot_columns: Vec::new(),
            with_timestamps: false,
            _parent: PhantomData,
        }
    }

    /// Expose additional pivot columns on the related models
    pub fn with_pivot(mut self, columns: &[&str]) -> Self {
        for column in columns {
            if !self.pivot_columns.iter().any(|c| c == column) {
                self.pivot_columns.push(column.to_string());
            }
        }
        self
    }

    /// The pivot table carries timestamps, set on attach and exposed on reads
    pub fn with_timestamps(mut self) -> Self {
        self.with_timestamps = true;
        let created_at = R::created_at_column();
        let updated_at = R::updated_at_column();
        self.with_pivot(&[created_at, updated_at])
    }

    pub fn get_table(&self) -> &str {
        &self.table
    }

    pub fn get_foreign_pivot_key_name(&self) -> &str {
        &self.foreign_pivot_key
    }

    pub fn get_related_pivot_key_name(&self) -> &str {
        &self.related_pivot_key
    }

    pub fn get_parent_key_name(&self) -> &str {
        &self.parent_key
    }

    pub fn get_related_key_name(&self) -> &str {
        &self.related_key
    }

    pub fn get_pivot_columns(&self) -> &[String] {
        &self.pivot_columns
    }

    fn pivot_select(&self) -> String {
        let mut columns = vec![self.foreign_pivot_key.as_str(), self.related_pivot_key.as_str()];
        columns.extend(self.pivot_columns.iter().map(String::as_str));

        columns
            .into_iter()
            .map(|column| format!("{}.{} as {}{}", self.table, column, PIVOT_PREFIX, column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Move `pivot_*` attributes into the pivot set, the rest stay as the
    /// synced attributes of the related model
    fn hydrate_pivot_relation(models: &mut [R]) {
        for model in models.iter_mut() {
            let (pivot, attributes): (Vec<AttributeItem>, Vec<AttributeItem>) = model
                .get_attributes()
                .iter()
                .cloned()
                .partition(|item| item.key.starts_with(PIVOT_PREFIX));

            model.base_mut().pivot = pivot
                .into_iter()
                .map(|item| AttributeItem {
                    key: item.key[PIVOT_PREFIX.len()..].to_string(),
                    value: item.value,
                })
                .collect();
            model.set_raw_attributes(attributes, true);
        }
    }

    fn pivot_query(&self) -> QueryBuilder {
        QueryBuilder::table(&self.table).where_eq(&self.foreign_pivot_key, self.parent_key_value.clone())
    }

    /// Insert pivot rows linking the parent to every id in `ids`
    pub fn attach<T: Into<Value>>(&self, ids: Vec<T>, attributes: &[AttributeItem]) -> OrmResult<()> {
        let connection = self.related.get_connection()?;
        let timestamp = if self.with_timestamps {
            Some(self.related.fresh_timestamp_binding()?)
        } else {
            None
        };

        for id in ids {
            let mut row = vec![
                AttributeItem::new(self.foreign_pivot_key.as_str(), self.parent_key_value.clone()),
                AttributeItem::new(self.related_pivot_key.as_str(), id),
            ];
            row.extend(attributes.iter().cloned());
            if let Some(timestamp) = &timestamp {
                row.push(AttributeItem::new(R::created_at_column(), timestamp.clone()));
                row.push(AttributeItem::new(R::updated_at_column(), timestamp.clone()));
            }
            connection.insert(&QueryBuilder::table(&self.table), &row)?;
        }
        Ok(())
    }

    /// Related ids currently attached to the parent
    pub fn current_ids(&self) -> OrmResult<Vec<Value>> {
        let query = self.pivot_query().select(&self.related_pivot_key);
        let rows = self.related.get_connection()?.select(&query)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.into_iter()
                    .find(|item| item.key == self.related_pivot_key)
                    .map(|item| item.value)
            })
            .collect())
    }

    /// Attach and detach so exactly `ids` are attached
    pub fn sync<T: Into<Value>>(&self, ids: Vec<T>) -> OrmResult<SyncChanges> {
        let records = ids.into_iter().map(|id| (id.into(), Vec::new())).collect();
        self.sync_with_attributes(records, true)
    }

    /// Attach the missing `ids`, keep everything already attached
    pub fn sync_without_detaching<T: Into<Value>>(&self, ids: Vec<T>) -> OrmResult<SyncChanges> {
        let records = ids.into_iter().map(|id| (id.into(), Vec::new())).collect();
        self.sync_with_attributes(records, false)
    }

    /// Sync with per id pivot attributes.
    ///
    /// New ids are attached with their attributes, ids already attached get
    /// their attributes written when they have any. With `detaching`, ids
    /// not in `records` are detached.
    pub fn sync_with_attributes(
        &self,
        records: Vec<(Value, Vec<AttributeItem>)>,
        detaching: bool,
    ) -> OrmResult<SyncChanges> {
        let current = self.current_ids()?;
        let mut changes = SyncChanges::default();

        if detaching {
            let detach: Vec<Value> = current
                .iter()
                .filter(|id| !records.iter().any(|(record, _)| same_id(record, id)))
                .cloned()
                .collect();
            if !detach.is_empty() {
                self.detach(Some(detach.clone()))?;
                changes.detached = detach;
            }
        }

        for (id, attributes) in records {
            if !current.iter().any(|attached| same_id(attached, &id)) {
                self.attach(vec![id.clone()], &attributes)?;
                changes.attached.push(id);
            } else if !attributes.is_empty() && self.update_existing_pivot(id.clone(), attributes)? > 0 {
                changes.updated.push(id);
            }
        }

        tracing::debug!(
            "Synced '{}': {} attached, {} detached, {} updated",
            self.table,
            changes.attached.len(),
            changes.detached.len(),
            changes.updated.len()
        );
        Ok(changes)
    }

    /// Detach the attached `ids` and attach the others
    pub fn toggle<T: Into<Value>>(&self, ids: Vec<T>) -> OrmResult<SyncChanges> {
        let current = self.current_ids()?;
        let (detach, attach): (Vec<Value>, Vec<Value>) = ids
            .into_iter()
            .map(Into::into)
            .partition(|id| current.iter().any(|attached| same_id(attached, id)));

        let mut changes = SyncChanges::default();
        if !detach.is_empty() {
            self.detach(Some(detach.clone()))?;
            changes.detached = detach;
        }
        if !attach.is_empty() {
            self.attach(attach.clone(), &[])?;
            changes.attached = attach;
        }
        Ok(changes)
    }

    /// Write `attributes` to the pivot row of related `id`, bumping the pivot
    /// `updated_at` when the pivot carries timestamps
    pub fn update_existing_pivot<T: Into<Value>>(&self, id: T, mut attributes: Vec<AttributeItem>) -> OrmResult<u64> {
        let updated_at = R::updated_at_column();
        if self.with_timestamps && !attributes.iter().any(|item| item.key == updated_at) {
            attributes.push(AttributeItem::new(updated_at, self.related.fresh_timestamp_binding()?));
        }
        if attributes.is_empty() {
            return Ok(0);
        }

        let query = self.pivot_query().where_eq(&self.related_pivot_key, id);
        let result = self.related.get_connection()?.update(&query, &attributes)?;
        Ok(result.affected_rows)
    }

    /// Delete pivot rows of the parent, limited to `ids` when given
    pub fn detach<T: Into<Value>>(&self, ids: Option<Vec<T>>) -> OrmResult<u64> {
        let mut query = self.pivot_query();
        if let Some(ids) = ids {
            query = query.where_in(&self.related_pivot_key, ids);
        }
        let result = self.related.get_connection()?.delete(&query)?;
        tracing::debug!("Detached {} row(s) from '{}'", result.affected_rows, self.table);
        Ok(result.affected_rows)
    }
}

fn same_id(a: &Value, b: &Value) -> bool {
    a.key_string().is_some() && a.key_string() == b.key_string()
}

impl<M: Model, R: Model> Relation<M, R> for BelongsToMany<M, R> {
    fn kind(&self) -> RelationKind {
        RelationKind::Many
    }

    fn related(&self) -> &R {
        &self.related
    }

    fn query(&self) -> &TinyBuilder<R> {
        &self.query
    }

    fn query_mut(&mut self) -> &mut TinyBuilder<R> {
        &mut self.query
    }

    fn add_eager_constraints(&mut self, models: &[M]) {
        let keys = collect_keys(models, &self.parent_key);
        let column = qualify(&self.table, &self.foreign_pivot_key);
        self.query.apply(|q| q.where_in(&column, keys));
    }

    fn existence_keys(&self) -> (String, String) {
        (
            qualify(M::table_name(), &self.parent_key),
            qualify(&self.table, &self.foreign_pivot_key),
        )
    }

    fn match_results(&self, models: &mut [M], results: Vec<R>, relation: &str) {
        let mut dictionary: std::collections::HashMap<String, Vec<R>> = Default::default();
        for result in results {
            if let Some(key) = result.pivot_attribute(&self.foreign_pivot_key).and_then(Value::key_string) {
                dictionary.entry(key).or_default().push(result);
            }
        }

        for model in models.iter_mut() {
            let related = model_key(model, &self.parent_key)
                .and_then(|key| dictionary.get(&key).cloned())
                .unwrap_or_default();
            model
                .base_mut()
                .relations
                .insert(relation.to_string(), RelationValue::many(related));
        }
    }

    fn get_results(&self) -> OrmResult<RelationValue> {
        if self.parent_key_value.is_null() {
            return Ok(RelationValue::many::<R>(Vec::new()));
        }
        Ok(RelationValue::many(self.get_eager()?))
    }

    fn get_eager(&self) -> OrmResult<Vec<R>> {
        let mut query = self.query.clone();
        let pivot_select = self.pivot_select();
        query.apply(|q| {
            let q = if q.get_columns().is_empty() {
                q.select(&format!("{}.*", R::table_name()))
            } else {
                q
            };
            q.add_select(&pivot_select)
        });

        let mut models = query.get()?;
        Self::hydrate_pivot_relation(&mut models);
        Ok(models)
    }

    /// Touch every related model attached to the parent
    fn touch(&self) -> OrmResult<u64> {
        let related_column = qualify(R::table_name(), &self.related_key);
        let mut ids_query = self.query.clone();
        ids_query.apply(|q| q.select(&related_column));
        let ids = ids_query.pluck(&self.related_key)?;

        if ids.is_empty() {
            return Ok(0);
        }
        self.related
            .new_query_without_relationships()
            .where_in(&related_column, ids)
            .touch()
    }

    fn qualify_column(&self, column: &str) -> String {
        if column.starts_with(PIVOT_PREFIX) {
            column.to_string()
        } else {
            qualify(R::table_name(), column)
        }
    }
}
