//! Soft deletes - `remove()` stamps `deleted_at` on models declaring
//! `soft_deletes()`, queries skip stamped rows unless asked otherwise

use super::attributes::HasAttributes;
use super::core_trait::Model;
use super::crud_operations::CrudOperations;
use crate::backends::Value;
use crate::error::OrmResult;
use crate::query::qualify;

pub trait SoftDeletes: Model {
    /// Delete the row for real
    fn force_delete(&mut self) -> OrmResult<bool> {
        self.perform_remove(true)
    }

    fn force_remove(&mut self) -> OrmResult<bool> {
        self.force_delete()
    }

    /// Clear `deleted_at` and save, `false` for a model without a row
    fn restore(&mut self) -> OrmResult<bool> {
        if !self.exists() {
            return Ok(false);
        }
        self.set_attribute(Self::deleted_at_column(), Value::Null)?;
        self.save()
    }

    /// Whether `deleted_at` is set
    fn trashed(&self) -> bool {
        self.get_attribute(Self::deleted_at_column())
            .is_some_and(|value| !value.is_null())
    }

    fn get_qualified_deleted_at_column(&self) -> String {
        qualify(Self::table_name(), Self::deleted_at_column())
    }
}

impl<M: Model> SoftDeletes for M {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::Archived;

    #[test]
    fn test_trashed_reads_deleted_at() {
        let mut archived = Archived::default();
        assert!(!archived.trashed());

        archived.set_attribute("deleted_at", Value::Null).unwrap();
        assert!(!archived.trashed());

        archived.set_attribute("deleted_at", "2022-01-04 20:46:31").unwrap();
        assert!(archived.trashed());
        assert_eq!(archived.get_qualified_deleted_at_column(), "archived.deleted_at");
        assert!(archived.get_dates().contains(&"deleted_at"));
    }

    #[test]
    fn test_restore_without_row_does_nothing() {
        let mut archived = Archived::default();
        assert!(!archived.restore().unwrap());
    }
}
