//! Timestamp management for models with `created_at` / `updated_at`

use chrono::{NaiveDateTime, Utc};

use super::attributes::HasAttributes;
use super::core_trait::Model;
use crate::backends::Value;
use crate::error::OrmResult;

pub trait HasTimestamps: Model {
    /// Current time, stored columns are formatted by `set_attribute`
    fn fresh_timestamp(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    /// Current time in the model's storage format
    fn fresh_timestamp_string(&self) -> OrmResult<Value> {
        self.from_date_time(&Value::DateTime(self.fresh_timestamp()))
    }

    /// Current time at storage precision, typed for binding
    fn fresh_timestamp_binding(&self) -> OrmResult<Value> {
        let stored = self.fresh_timestamp_string()?;
        Ok(self.to_bindable_date(&stored))
    }

    /// Set `updated_at`, and `created_at` for a new row, unless the caller
    /// already changed them
    fn update_timestamps(&mut self) -> OrmResult<&mut Self> {
        let time = self.fresh_timestamp();

        let updated_at = Self::updated_at_column();
        if !updated_at.is_empty() && !self.is_dirty(&[updated_at]) {
            self.set_updated_at(time)?;
        }

        let created_at = Self::created_at_column();
        if !self.exists() && !created_at.is_empty() && !self.is_dirty(&[created_at]) {
            self.set_created_at(time)?;
        }
        Ok(self)
    }

    fn set_created_at(&mut self, value: NaiveDateTime) -> OrmResult<&mut Self> {
        self.set_attribute(Self::created_at_column(), value)
    }

    fn set_updated_at(&mut self, value: NaiveDateTime) -> OrmResult<&mut Self> {
        self.set_attribute(Self::updated_at_column(), value)
    }
}

impl<M: Model> HasTimestamps for M {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::Post;

    #[test]
    fn test_new_model_gets_both_timestamps() {
        let mut post = Post::default();
        post.update_timestamps().unwrap();

        assert!(post.get_attribute("created_at").is_some());
        assert_eq!(post.get_attribute("created_at"), post.get_attribute("updated_at"));
    }

    #[test]
    fn test_existing_model_only_gets_updated_at() {
        let mut post = Post::default();
        post.set_exists(true);
        post.update_timestamps().unwrap();

        assert!(post.get_attribute("created_at").is_none());
        assert!(post.get_attribute("updated_at").is_some());
    }

    #[test]
    fn test_fresh_timestamp_binding_is_typed() {
        let post = Post::default();
        let Value::DateTime(bound) = post.fresh_timestamp_binding().unwrap() else {
            panic!("expected a typed timestamp");
        };
        assert_eq!(chrono::Timelike::nanosecond(&bound), 0);
    }

    #[test]
    fn test_explicit_timestamp_is_kept() {
        let mut post = Post::default();
        post.set_attribute("updated_at", "2020-02-02 02:02:02").unwrap();
        post.update_timestamps().unwrap();

        assert_eq!(
            post.get_attribute("updated_at"),
            Some(&Value::from("2020-02-02 02:02:02"))
        );
    }
}
