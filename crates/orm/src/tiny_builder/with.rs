//! Eager load items for `with()`
//!
//! An item names a relation, possibly dotted (`"torrentFiles.fileProperty"`),
//! and may carry a constraint closure or a column list written as
//! `"relation:col1,col2"`.

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, OrmResult};
use crate::query::QueryBuilder;

/// Constraint applied to a relation's query while eager loading
pub type WithConstraint = Arc<dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync>;

#[derive(Clone)]
pub struct WithItem {
    pub(crate) name: String,
    pub(crate) constraint: Option<WithConstraint>,
    pub(crate) columns: Vec<String>,
}

impl fmt::Debug for WithItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithItem")
            .field("name", &self.name)
            .field("constrained", &self.constraint.is_some())
            .field("columns", &self.columns)
            .finish()
    }
}

impl WithItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
            columns: Vec::new(),
        }
    }

    /// Eager load `name` with `constraint` applied to its query
    pub fn constrained<F>(name: impl Into<String>, constraint: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constraint: Some(Arc::new(constraint)),
            columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns selected on the related query, empty for all
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_constraint(&self) -> bool {
        self.constraint.is_some()
    }

    /// Whether this item is a dotted descendant of `relation`
    pub fn is_nested_under(&self, relation: &str) -> bool {
        self.name.len() > relation.len() + 1
            && self.name.starts_with(relation)
            && self.name.as_bytes()[relation.len()] == b'.'
    }

    /// Split a `"relation:col1,col2"` name into the relation and its columns
    pub(crate) fn parse_columns(mut self) -> OrmResult<Self> {
        let Some((relation, columns)) = self.name.split_once(':') else {
            return Ok(self);
        };

        let relation = relation.trim();
        if relation.is_empty() || columns.contains(':') {
            return Err(invalid(&self.name));
        }

        let columns: Vec<String> = columns
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_string)
            .collect();
        if columns.is_empty() {
            return Err(invalid(&self.name));
        }

        self.name = relation.to_string();
        self.columns = columns;
        Ok(self)
    }
}

impl From<&str> for WithItem {
    fn from(name: &str) -> Self {
        WithItem::new(name)
    }
}

impl From<String> for WithItem {
    fn from(name: String) -> Self {
        WithItem::new(name)
    }
}

fn invalid(name: &str) -> ModelError {
    tracing::error!("Malformed with() constraint '{}'", name);
    ModelError::InvalidWithConstraint(format!(
        "'{}' must be written as 'relation:column1,column2'",
        name
    ))
}

/// Add `item` to an eager load list, inserting missing parents of a dotted
/// name first; an item already present by name is replaced
pub(crate) fn add_with_item(items: &mut Vec<WithItem>, item: WithItem) {
    let mut progress = String::new();
    let segments: Vec<&str> = item.name.split('.').collect();

    for segment in &segments[..segments.len().saturating_sub(1)] {
        if !progress.is_empty() {
            progress.push('.');
        }
        progress.push_str(segment);

        if !items.iter().any(|existing| existing.name == progress) {
            items.push(WithItem::new(progress.clone()));
        }
    }

    match items.iter_mut().find(|existing| existing.name == item.name) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

/// Items nested under `relation` with the `relation.` prefix removed
pub(crate) fn relations_nested_under(items: &[WithItem], relation: &str) -> Vec<WithItem> {
    items
        .iter()
        .filter(|item| item.is_nested_under(relation))
        .map(|item| WithItem {
            name: item.name[relation.len() + 1..].to_string(),
            constraint: item.constraint.clone(),
            columns: item.columns.clone(),
        })
        .collect()
}
