//! Core Database Backend Types
//!
//! The dynamically typed [`Value`], the ordered attribute representation used
//! for rows and model state, and the blocking [`Connection`] contract every
//! driver implements.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::OrmResult;
use crate::query::{QueryBuilder, QueryGrammar};

/// Dynamically typed column value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Json(JsonValue),
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::UInt(u) => Some(*u),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::UInt(u) => Some(*u != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Dictionary key used when matching related rows back onto parents.
    ///
    /// Integer values of either signedness produce the same key, so a parent
    /// key of `Int(4)` matches a foreign key of `UInt(4)` or `String("4")`.
    pub fn key_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::DateTime(dt) => Some(dt.to_string()),
            Value::Date(d) => Some(d.to_string()),
            Value::Bytes(b) => Some(format!("{:?}", b)),
            Value::Json(j) => Some(j.to_string()),
        }
    }

    /// Equality that tolerates numeric representation differences
    pub fn loosely_eq(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                matches!((self.as_f64(), other.as_f64()), (Some(a), Some(b)) if a == b)
            }
            _ => match (self.key_string(), other.key_string()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Ordering used by comparison operators and `ORDER BY`, nulls first
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => match (self.key_string(), other.key_string()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => None,
                },
            },
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number(serde_json::Number::from(*i)),
            Value::UInt(u) => JsonValue::Number(serde_json::Number::from(*u)),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bytes(b) => JsonValue::Array(
                b.iter()
                    .map(|&x| JsonValue::Number(serde_json::Number::from(x)))
                    .collect(),
            ),
            Value::Uuid(u) => JsonValue::String(u.to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.to_string()),
            Value::Date(d) => JsonValue::String(d.to_string()),
            Value::Json(j) => j.clone(),
        }
    }

    /// Create Value from JSON value
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            JsonValue::String(s) => Value::String(s),
            other => Value::Json(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::DateTime(dt) => write!(f, "'{}'", dt),
            Value::Date(d) => write!(f, "'{}'", d),
            Value::Uuid(u) => write!(f, "'{}'", u),
            other => match other.key_string() {
                Some(s) => write!(f, "{}", s),
                None => write!(f, "NULL"),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Value::DateTime(value.naive_utc())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Json(value)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// One column of a row or a model's attribute set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeItem {
    pub key: String,
    pub value: Value,
}

impl AttributeItem {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for AttributeItem {
    fn from((key, value): (K, V)) -> Self {
        AttributeItem::new(key, value)
    }
}

/// Build an attribute list from `(key, value)` pairs
pub fn attributes<I, T>(items: I) -> Vec<AttributeItem>
where
    I: IntoIterator<Item = T>,
    T: Into<AttributeItem>,
{
    items.into_iter().map(Into::into).collect()
}

/// A result row, columns in the order the database returned them
pub type Row = Vec<AttributeItem>;

/// Outcome of an affecting statement
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResult {
    pub affected_rows: u64,
    /// The SQL that was executed, for logging
    pub sql: String,
}

/// Blocking database connection.
///
/// Every call returns when the driver has a result; drivers report execution
/// failures as [`crate::error::ModelError::Database`].
pub trait Connection: Send + Sync {
    /// Connection name as registered in the resolver
    fn name(&self) -> &str;

    /// Grammar used to compile queries, also supplies the date format
    fn grammar(&self) -> &QueryGrammar;

    /// Run a select query
    fn select(&self, query: &QueryBuilder) -> OrmResult<Vec<Row>>;

    /// Insert a row
    fn insert(&self, query: &QueryBuilder, values: &[AttributeItem]) -> OrmResult<StatementResult>;

    /// Insert a row and return the generated id, `0` when none was produced
    fn insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &[AttributeItem],
        sequence: Option<&str>,
    ) -> OrmResult<u64>;

    /// Update the rows matched by the query
    fn update(&self, query: &QueryBuilder, values: &[AttributeItem]) -> OrmResult<StatementResult>;

    /// Delete the rows matched by the query
    fn delete(&self, query: &QueryBuilder) -> OrmResult<StatementResult>;
}
