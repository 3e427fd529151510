//! Resolved relation values
//!
//! A model caches resolved relations by name. The value is either a list of
//! related models or an optional single one, erased over the related type so
//! relations with different related models share one map.

use std::any::Any;
use std::fmt::Debug;

use crate::model::Model;

/// Object safe view of a cached `Vec<R>` or `Option<R>`
pub trait AnyRelated: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn AnyRelated>;
}

impl<T> AnyRelated for T
where
    T: Any + Clone + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn AnyRelated> {
        Box::new(self.clone())
    }
}

/// A resolved relation: `Many` holds `Vec<R>`, `One` holds `Option<R>`
#[derive(Debug)]
pub enum RelationValue {
    Many(Box<dyn AnyRelated>),
    One(Box<dyn AnyRelated>),
}

// Calls go through `**inner` so the blanket impl is not picked for `&Box<_>`
impl Clone for RelationValue {
    fn clone(&self) -> Self {
        match self {
            RelationValue::Many(inner) => RelationValue::Many((**inner).clone_box()),
            RelationValue::One(inner) => RelationValue::One((**inner).clone_box()),
        }
    }
}

impl RelationValue {
    pub fn many<R: Model>(models: Vec<R>) -> Self {
        RelationValue::Many(Box::new(models))
    }

    pub fn one<R: Model>(model: Option<R>) -> Self {
        RelationValue::One(Box::new(model))
    }

    pub fn is_many(&self) -> bool {
        matches!(self, RelationValue::Many(_))
    }

    pub fn is_one(&self) -> bool {
        matches!(self, RelationValue::One(_))
    }

    /// The related models of a `Many` value, `None` on a shape or type mismatch
    pub fn as_many<R: Model>(&self) -> Option<&Vec<R>> {
        match self {
            RelationValue::Many(inner) => (**inner).as_any().downcast_ref::<Vec<R>>(),
            RelationValue::One(_) => None,
        }
    }

    pub fn as_many_mut<R: Model>(&mut self) -> Option<&mut Vec<R>> {
        match self {
            RelationValue::Many(inner) => (**inner).as_any_mut().downcast_mut::<Vec<R>>(),
            RelationValue::One(_) => None,
        }
    }

    /// The related model of a `One` value, `None` on a shape or type mismatch
    pub fn as_one<R: Model>(&self) -> Option<&Option<R>> {
        match self {
            RelationValue::One(inner) => (**inner).as_any().downcast_ref::<Option<R>>(),
            RelationValue::Many(_) => None,
        }
    }

    pub fn as_one_mut<R: Model>(&mut self) -> Option<&mut Option<R>> {
        match self {
            RelationValue::One(inner) => (**inner).as_any_mut().downcast_mut::<Option<R>>(),
            RelationValue::Many(_) => None,
        }
    }

    /// Whether the value holds models of type `R`
    pub fn holds<R: Model>(&self) -> bool {
        match self {
            RelationValue::Many(inner) => (**inner).as_any().is::<Vec<R>>(),
            RelationValue::One(inner) => (**inner).as_any().is::<Option<R>>(),
        }
    }

    /// Number of related models held
    pub fn count<R: Model>(&self) -> usize {
        match self {
            RelationValue::Many(_) => self.as_many::<R>().map_or(0, Vec::len),
            RelationValue::One(_) => self.as_one::<R>().map_or(0, |m| usize::from(m.is_some())),
        }
    }
}
