//! Mass assignment guards for `fill()`
//!
//! A model with neither `fillable()` nor `guarded()` accepts every attribute.
//! Listing fillable attributes restricts `fill()` to them, listing guarded
//! ones removes them. `guarded() == ["*"]` with nothing fillable makes
//! `fill()` fail instead of skipping.

use std::cell::Cell;

use super::core_trait::Model;
use crate::backends::AttributeItem;
use crate::query::unqualified;

thread_local! {
    static UNGUARDED: Cell<bool> = const { Cell::new(false) };
}

struct RestoreGuards(bool);

impl Drop for RestoreGuards {
    fn drop(&mut self) {
        UNGUARDED.with(|unguarded| unguarded.set(self.0));
    }
}

/// Run `f` with mass assignment guards disabled on this thread
pub fn unguarded<T>(f: impl FnOnce() -> T) -> T {
    let previous = UNGUARDED.with(|unguarded| unguarded.replace(true));
    let _restore = RestoreGuards(previous);
    f()
}

pub fn is_unguarded() -> bool {
    UNGUARDED.with(Cell::get)
}

pub trait GuardsAttributes: Model {
    fn is_fillable(key: &str) -> bool {
        if is_unguarded() || Self::fillable().contains(&key) {
            return true;
        }
        if Self::is_guarded(key) {
            return false;
        }
        Self::fillable().is_empty() && !key.contains('.') && !key.starts_with('_')
    }

    fn is_guarded(key: &str) -> bool {
        let guarded = Self::guarded();
        if guarded.is_empty() {
            return false;
        }
        guarded == ["*"] || guarded.iter().any(|column| column.eq_ignore_ascii_case(key))
    }

    fn totally_guarded() -> bool {
        Self::fillable().is_empty() && Self::guarded() == ["*"]
    }

    /// `attributes` restricted to the fillable list, when one is declared
    fn fillable_from_array(attributes: Vec<AttributeItem>) -> Vec<AttributeItem> {
        let fillable = Self::fillable();
        if fillable.is_empty() || is_unguarded() {
            return attributes;
        }
        attributes
            .into_iter()
            .filter(|item| fillable.contains(&unqualified(&item.key)))
            .collect()
    }
}

impl<M: Model> GuardsAttributes for M {}
