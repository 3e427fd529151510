//! Attribute store - current attributes, the synced original and the changes
//! of the last save
//!
//! Attribute order is column order: setting an existing key replaces its
//! value in place, a new key is appended.

use chrono::{NaiveDate, NaiveDateTime};

use super::base::{find, position, upsert};
use super::core_trait::{snake_case, Model};
use super::guards::{unguarded, GuardsAttributes};
use crate::backends::{AttributeItem, Value};
use crate::error::{ModelError, OrmResult};
use crate::query::{qualify, unqualified};

/// Attribute access and dirty tracking, implemented for every model
pub trait HasAttributes: Model {
    /// Current value of `key`, `None` when the model has no such attribute
    fn get_attribute(&self, key: &str) -> Option<&Value> {
        find(&self.base().attributes, key).map(|item| &item.value)
    }

    /// Set `key`, converting values of date columns to the storage format
    fn set_attribute<V: Into<Value>>(&mut self, key: &str, value: V) -> OrmResult<&mut Self> {
        let mut value = value.into();
        if !value.is_null() && self.is_date_attribute(key) {
            value = self.from_date_time(&value)?;
        }

        upsert(&mut self.base_mut().attributes, AttributeItem::new(key, value));
        Ok(self)
    }

    /// Set the fillable attributes in order, later duplicates win.
    ///
    /// Attributes the guards reject are skipped, on a totally guarded model
    /// they fail with [`ModelError::MassAssignment`].
    fn fill<I, T>(&mut self, attributes: I) -> OrmResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        let totally_guarded = Self::totally_guarded();
        let attributes = Self::fillable_from_array(attributes.into_iter().map(Into::into).collect());

        for item in attributes {
            let key = unqualified(&item.key).to_string();
            if Self::is_fillable(&key) {
                self.set_attribute(&key, item.value)?;
            } else if totally_guarded {
                return Err(ModelError::MassAssignment {
                    model: Self::model_name().to_string(),
                    attribute: key,
                });
            } else {
                tracing::trace!("Skipped guarded attribute '{}' of '{}'", key, Self::model_name());
            }
        }
        Ok(self)
    }

    /// Set every attribute in order, ignoring the guards
    fn force_fill<I, T>(&mut self, attributes: I) -> OrmResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        unguarded(|| self.fill(attributes).map(|_| ()))?;
        Ok(self)
    }

    fn get_attributes(&self) -> &[AttributeItem] {
        &self.base().attributes
    }

    fn get_original(&self) -> &[AttributeItem] {
        &self.base().original
    }

    fn get_raw_original(&self, key: &str) -> Option<&Value> {
        find(&self.base().original, key).map(|item| &item.value)
    }

    /// Replace all attributes without conversion, optionally syncing the
    /// original to them
    fn set_raw_attributes(&mut self, attributes: Vec<AttributeItem>, sync: bool) -> &mut Self {
        self.base_mut().attributes = attributes;
        if sync {
            self.sync_original();
        }
        self
    }

    fn sync_original(&mut self) -> &mut Self {
        let base = self.base_mut();
        base.original = base.attributes.clone();
        self
    }

    fn sync_original_attribute(&mut self, key: &str) -> &mut Self {
        let base = self.base_mut();
        match find(&base.attributes, key).cloned() {
            Some(item) => upsert(&mut base.original, item),
            None => {
                if let Some(index) = position(&base.original, key) {
                    base.original.remove(index);
                }
            }
        }
        self
    }

    /// Record the current dirty set as the changes of the last save
    fn sync_changes(&mut self) -> &mut Self {
        let dirty = self.get_dirty();
        self.base_mut().changes = dirty;
        self
    }

    /// Attributes whose value is not equivalent to the original
    fn get_dirty(&self) -> Vec<AttributeItem> {
        self.get_attributes()
            .iter()
            .filter(|item| !self.original_is_equivalent(&item.key))
            .cloned()
            .collect()
    }

    /// Whether any of `keys` is dirty, any attribute at all when `keys` is empty
    fn is_dirty(&self, keys: &[&str]) -> bool {
        has_changes(&self.get_dirty(), keys)
    }

    fn is_clean(&self, keys: &[&str]) -> bool {
        !self.is_dirty(keys)
    }

    /// Whether any of `keys` changed in the last save
    fn was_changed(&self, keys: &[&str]) -> bool {
        has_changes(&self.base().changes, keys)
    }

    fn get_changes(&self) -> &[AttributeItem] {
        &self.base().changes
    }

    /// Whether the current value of `key` matches the original.
    ///
    /// Date columns compare their formatted representation so precision
    /// below the storage format does not count as a change.
    fn original_is_equivalent(&self, key: &str) -> bool {
        let Some(original) = self.get_raw_original(key) else {
            return false;
        };
        let current = self.get_attribute(key).unwrap_or(&Value::Null);

        if current == original {
            return true;
        }
        if current.is_null() || original.is_null() {
            return false;
        }
        if self.is_date_attribute(key) {
            return match (self.from_date_time(current), self.from_date_time(original)) {
                (Ok(current), Ok(original)) => current == original,
                _ => false,
            };
        }
        false
    }

    /// Attributes restricted to `keys`, in the order of `keys`
    fn only(&self, keys: &[&str]) -> Vec<AttributeItem> {
        keys.iter()
            .filter_map(|key| find(self.get_attributes(), key).cloned())
            .collect()
    }

    fn unset_attribute(&mut self, key: &str) -> &mut Self {
        let attributes = &mut self.base_mut().attributes;
        if let Some(index) = position(attributes, key) {
            attributes.remove(index);
        }
        self
    }

    /// Primary key value
    fn get_key(&self) -> Option<&Value> {
        self.get_attribute(Self::primary_key_name())
    }

    fn get_key_name(&self) -> &'static str {
        Self::primary_key_name()
    }

    fn get_qualified_key_name(&self) -> String {
        qualify(Self::table_name(), Self::primary_key_name())
    }

    /// Default foreign key other tables use to point at this model
    fn get_foreign_key(&self) -> String {
        format!("{}_{}", snake_case(Self::model_name()), Self::primary_key_name())
    }

    /// Pivot attributes when loaded through a many to many relation
    fn pivot(&self) -> &[AttributeItem] {
        &self.base().pivot
    }

    fn pivot_attribute(&self, key: &str) -> Option<&Value> {
        find(&self.base().pivot, key).map(|item| &item.value)
    }

    /// Timestamp columns when managed, followed by the declared dates
    fn get_dates(&self) -> Vec<&'static str> {
        let mut dates = Vec::new();
        if Self::uses_timestamps() {
            dates.push(Self::created_at_column());
            dates.push(Self::updated_at_column());
        }
        if Self::soft_deletes() {
            dates.push(Self::deleted_at_column());
        }
        for date in Self::dates() {
            if !dates.contains(date) {
                dates.push(date);
            }
        }
        dates
    }

    fn is_date_attribute(&self, key: &str) -> bool {
        self.get_dates().contains(&key)
    }

    /// The model's date format, else the connection's, else the default
    fn get_date_format(&self) -> String {
        if let Some(format) = Self::date_format() {
            return format.to_string();
        }
        match self.get_connection() {
            Ok(connection) => connection.grammar().date_format().to_string(),
            Err(_) => tinyorm_core::config::DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Storage representation of a date value
    fn from_date_time(&self, value: &Value) -> OrmResult<Value> {
        let format = self.get_date_format();
        match self.as_date_time(value)? {
            Some(datetime) => Ok(Value::String(datetime.format(&format).to_string())),
            None => Ok(Value::Null),
        }
    }

    /// Typed form of a stored date for binding, formats without a time of
    /// day bind a plain date. Values that do not parse are passed through.
    fn to_bindable_date(&self, value: &Value) -> Value {
        let Value::String(_) = value else {
            return value.clone();
        };
        match self.as_date_time(value) {
            Ok(Some(datetime)) if has_time_of_day(&self.get_date_format()) => Value::DateTime(datetime),
            Ok(Some(datetime)) => Value::Date(datetime.date()),
            _ => value.clone(),
        }
    }

    /// `items` with the values of date columns typed for binding
    fn attributes_for_binding(&self, items: &[AttributeItem]) -> Vec<AttributeItem> {
        items
            .iter()
            .map(|item| {
                if item.value.is_null() || !self.is_date_attribute(unqualified(&item.key)) {
                    return item.clone();
                }
                AttributeItem {
                    key: item.key.clone(),
                    value: self.to_bindable_date(&item.value),
                }
            })
            .collect()
    }

    /// Parse a date value, strings are read with the storage format
    fn as_date_time(&self, value: &Value) -> OrmResult<Option<NaiveDateTime>> {
        match value {
            Value::Null => Ok(None),
            Value::DateTime(datetime) => Ok(Some(*datetime)),
            Value::Date(date) => Ok(date.and_hms_opt(0, 0, 0)),
            Value::String(text) => parse_date_time(text, &self.get_date_format()).map(Some),
            other => Err(ModelError::DateParse {
                value: other.to_string(),
                format: self.get_date_format(),
            }),
        }
    }
}

impl<M: Model> HasAttributes for M {}

/// Whether `changes` touches any of `attributes`, or is non-empty when no
/// attributes are named
pub fn has_changes(changes: &[AttributeItem], attributes: &[&str]) -> bool {
    if attributes.is_empty() {
        return !changes.is_empty();
    }
    attributes
        .iter()
        .any(|key| changes.iter().any(|item| item.key == *key))
}

fn has_time_of_day(format: &str) -> bool {
    ["%H", "%I", "%T", "%R", "%X", "%c", "%s"]
        .iter()
        .any(|specifier| format.contains(specifier))
}

/// Parse `text` with `format`, tolerating fractional seconds the format does
/// not carry and a plain date
pub fn parse_date_time(text: &str, format: &str) -> OrmResult<NaiveDateTime> {
    let text = text.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
        return Ok(datetime);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, &format!("{}%.f", format)) {
        return Ok(datetime);
    }
    if let Some(without) = format.strip_suffix("%.f") {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, without) {
            return Ok(datetime);
        }
    }
    if let Some(datetime) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(datetime);
    }

    Err(ModelError::DateParse {
        value: text.to_string(),
        format: format.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{Locked, Post};

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut post = Post::default();
        post.fill([("title", "a"), ("body", "b"), ("title", "c")]).unwrap();

        let keys: Vec<&str> = post.get_attributes().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "body"]);
        assert_eq!(post.get_attribute("title"), Some(&Value::from("c")));
        assert_eq!(post.get_attribute("missing"), None);
    }

    #[test]
    fn test_sync_original_clears_dirty() {
        let mut post = Post::default();
        post.fill([("title", "a"), ("body", "b")]).unwrap();
        assert_eq!(post.get_dirty().len(), 2);

        post.sync_original();
        assert!(post.get_dirty().is_empty());
        assert!(post.is_clean(&[]));
    }

    #[test]
    fn test_dirty_by_key() {
        let mut post = Post::default();
        post.fill([("title", "a"), ("body", "b")]).unwrap();
        post.sync_original();
        post.set_attribute("body", "changed").unwrap();

        assert!(post.is_dirty(&["body"]));
        assert!(!post.is_dirty(&["title"]));
        assert!(post.is_dirty(&[]));
    }

    #[test]
    fn test_date_precision_is_not_dirty() {
        let mut post = Post::default();
        post.set_raw_attributes(
            vec![AttributeItem::new("published_at", "2021-01-01 10:00:00.123")],
            true,
        );
        post.base_mut().attributes[0].value = Value::from("2021-01-01 10:00:00");
        assert!(post.get_dirty().is_empty());

        post.base_mut().attributes[0].value = Value::from("2021-01-01 10:00:01");
        assert_eq!(post.get_dirty().len(), 1);
    }

    #[test]
    fn test_date_attribute_is_formatted() {
        let mut post = Post::default();
        let datetime = NaiveDate::from_ymd_opt(2022, 3, 4)
            .unwrap()
            .and_hms_milli_opt(5, 6, 7, 890)
            .unwrap();
        post.set_attribute("published_at", datetime).unwrap();

        assert_eq!(
            post.get_attribute("published_at"),
            Some(&Value::from("2022-03-04 05:06:07"))
        );
    }

    #[test]
    fn test_malformed_date_fails() {
        let mut post = Post::default();
        let result = post.set_attribute("published_at", "yesterday");
        assert!(matches!(result, Err(ModelError::DateParse { .. })));
    }

    #[test]
    fn test_date_columns_bind_typed() {
        let mut post = Post::default();
        post.fill([("title", "a"), ("published_at", "2022-03-04 05:06:07")]).unwrap();

        let bound = post.attributes_for_binding(post.get_attributes());
        let expected = NaiveDate::from_ymd_opt(2022, 3, 4)
            .and_then(|date| date.and_hms_opt(5, 6, 7))
            .unwrap();
        assert_eq!(bound[0].value, Value::from("a"));
        assert_eq!(bound[1].value, Value::DateTime(expected));
        assert_eq!(post.to_bindable_date(&Value::Null), Value::Null);
        assert!(has_time_of_day("%Y-%m-%d %H:%M:%S"));
        assert!(!has_time_of_day("%d.%m.%Y"));
    }

    #[test]
    fn test_fill_skips_guarded_attributes() {
        let mut post = Post::default();
        post.fill([("id", "7"), ("posts.title", "a"), ("views", "3")]).unwrap();
        assert_eq!(post.get_attributes(), &[AttributeItem::new("title", "a")]);

        post.force_fill([("id", 7)]).unwrap();
        assert_eq!(post.get_key(), Some(&Value::from(7)));
    }

    #[test]
    fn test_fill_on_totally_guarded_model_fails() {
        let mut locked = Locked::default();
        let result = locked.fill([("name", "x")]);
        assert!(matches!(result, Err(ModelError::MassAssignment { .. })));
        assert!(locked.get_attributes().is_empty());

        locked.force_fill([("name", "x")]).unwrap();
        assert_eq!(locked.get_attribute("name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_has_changes() {
        let changes = vec![AttributeItem::new("name", "x")];
        assert!(has_changes(&changes, &[]));
        assert!(has_changes(&changes, &["name"]));
        assert!(!has_changes(&changes, &["size"]));
        assert!(!has_changes(&[], &[]));
    }

    #[test]
    fn test_key_names() {
        let post = Post::default();
        assert_eq!(post.get_key_name(), "id");
        assert_eq!(post.get_qualified_key_name(), "posts.id");
        assert_eq!(post.get_foreign_key(), "post_id");
    }

    #[test]
    fn test_only_and_unset() {
        let mut post = Post::default();
        post.fill([("title", "a"), ("body", "b")]).unwrap();
        assert_eq!(post.only(&["body"]), vec![AttributeItem::new("body", "b")]);

        post.unset_attribute("title");
        assert_eq!(post.get_attribute("title"), None);
    }

    #[test]
    fn test_parse_date_time_fallbacks() {
        let format = "%Y-%m-%d %H:%M:%S";
        assert!(parse_date_time("2021-01-01 10:00:00", format).is_ok());
        assert!(parse_date_time("2021-01-01 10:00:00.5", format).is_ok());
        assert!(parse_date_time("2021-01-01", format).is_ok());
        assert!(parse_date_time("2021-01-01 10:00:00", "%Y-%m-%d %H:%M:%S%.f").is_ok());
        assert!(parse_date_time("01/01/2021", format).is_err());
    }
}
