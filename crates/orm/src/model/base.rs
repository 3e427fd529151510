//! Base model state embedded in every model type

use std::collections::HashMap;
use std::sync::Arc;

use crate::backends::AttributeItem;
use crate::connection::ConnectionResolver;
use crate::relationships::{RelationValue, StoreSlot};

/// Row state shared by every model: attributes, their synced original, the
/// changes of the last save, loaded relations and connection selection.
///
/// Model types embed one and expose it through [`super::Model::base`].
#[derive(Debug, Default, Clone)]
pub struct BaseModel {
    pub(crate) attributes: Vec<AttributeItem>,
    pub(crate) original: Vec<AttributeItem>,
    pub(crate) changes: Vec<AttributeItem>,
    pub(crate) exists: bool,
    pub(crate) relations: HashMap<String, RelationValue>,
    pub(crate) pivot: Vec<AttributeItem>,
    pub(crate) resolver: Option<Arc<dyn ConnectionResolver>>,
    pub(crate) connection: Option<String>,
    pub(crate) store: StoreSlot,
}

impl BaseModel {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Position of `key` in an attribute list
pub(crate) fn position(items: &[AttributeItem], key: &str) -> Option<usize> {
    items.iter().position(|item| item.key == key)
}

/// Value of `key` in an attribute list
pub(crate) fn find<'a>(items: &'a [AttributeItem], key: &str) -> Option<&'a AttributeItem> {
    items.iter().find(|item| item.key == key)
}

/// Replace the value of an existing key in place, append otherwise
pub(crate) fn upsert(items: &mut Vec<AttributeItem>, item: AttributeItem) {
    match position(items, &item.key) {
        Some(index) => items[index].value = item.value,
        None => items.push(item),
    }
}
