//! PostgreSQL Backend Implementation
//!
//! Blocking [`Connection`] over a sqlx pool. Statements are driven to
//! completion on a private current-thread tokio runtime, so the model layer
//! stays synchronous.

use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, Pool, Postgres, Row as SqlxRow, TypeInfo};
use serde_json::Value as JsonValue;
use tokio::runtime::{Builder, Runtime};

use super::core::*;
use crate::error::{ConnectionError, OrmError, OrmResult};
use crate::query::{QueryBuilder, QueryGrammar};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// PostgreSQL connection
pub struct PostgresConnection {
    name: String,
    grammar: QueryGrammar,
    pool: Pool<Postgres>,
    runtime: Runtime,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("name", &self.name)
            .field("grammar", &self.grammar)
            .finish()
    }
}

impl PostgresConnection {
    /// Connect to `database_url` with at most `max_connections` pooled connections
    pub fn connect(
        name: impl Into<String>,
        database_url: &str,
        max_connections: u32,
        date_format: &str,
    ) -> Result<Self, ConnectionError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let pool = runtime.block_on(
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(database_url),
        )?;

        let name = name.into();
        tracing::info!("PostgreSQL connection '{}' established", name);

        Ok(Self {
            name,
            grammar: QueryGrammar::new(date_format),
            pool,
            runtime,
        })
    }

    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tracing::debug!(target: "tinyorm::postgres", "{} {:?}", sql, params);

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param)?;
        }

        let result = self
            .runtime
            .block_on(query.execute(&self.pool))
            .map_err(|e| OrmError::Database(format!("Query execution failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<PgRow>> {
        tracing::debug!(target: "tinyorm::postgres", "{} {:?}", sql, params);

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param)?;
        }

        self.runtime
            .block_on(query.fetch_all(&self.pool))
            .map_err(|e| OrmError::Database(format!("Query fetch failed: {}", e)))
    }
}

impl Connection for PostgresConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn grammar(&self) -> &QueryGrammar {
        &self.grammar
    }

    fn select(&self, query: &QueryBuilder) -> OrmResult<Vec<Row>> {
        let (sql, params) = self.grammar.compile_select(query);
        self.fetch_all(&sql, &params)?
            .iter()
            .map(row_to_attributes)
            .collect()
    }

    fn insert(&self, query: &QueryBuilder, values: &[AttributeItem]) -> OrmResult<StatementResult> {
        let (sql, params) = self.grammar.compile_insert(query, values);
        let affected_rows = self.execute(&sql, &params)?;
        Ok(StatementResult { affected_rows, sql })
    }

    fn insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &[AttributeItem],
        sequence: Option<&str>,
    ) -> OrmResult<u64> {
        let (sql, params) = self.grammar.compile_insert_get_id(query, values, sequence);
        let rows = self.fetch_all(&sql, &params)?;

        let id = match rows.first() {
            Some(row) => postgres_value(row, 0)?,
            None => Value::Null,
        };
        Ok(id.as_u64().unwrap_or(0))
    }

    fn update(&self, query: &QueryBuilder, values: &[AttributeItem]) -> OrmResult<StatementResult> {
        let (sql, params) = self.grammar.compile_update(query, values);
        let affected_rows = self.execute(&sql, &params)?;
        Ok(StatementResult { affected_rows, sql })
    }

    fn delete(&self, query: &QueryBuilder) -> OrmResult<StatementResult> {
        let (sql, params) = self.grammar.compile_delete(query);
        let affected_rows = self.execute(&sql, &params)?;
        Ok(StatementResult { affected_rows, sql })
    }
}

/// Postgres parameter type chosen for a [`Value`]
#[derive(Debug, Clone, PartialEq)]
enum PgBind {
    Bool(bool),
    Int8(i64),
    Float8(f64),
    Text(String),
    Bytea(Vec<u8>),
    Uuid(uuid::Uuid),
    Timestamp(chrono::NaiveDateTime),
    Date(chrono::NaiveDate),
    Json(JsonValue),
}

/// Map a value to its parameter type.
///
/// NULL never reaches a bind, the grammar writes it inline.
fn pg_bind(value: &Value) -> OrmResult<PgBind> {
    Ok(match value {
        Value::Null => {
            return Err(OrmError::Query("NULL must be inlined, not bound".to_string()));
        }
        Value::Bool(b) => PgBind::Bool(*b),
        Value::Int(i) => PgBind::Int8(*i),
        Value::UInt(u) => PgBind::Int8(
            i64::try_from(*u).map_err(|_| OrmError::Query(format!("Value {} does not fit into BIGINT", u)))?,
        ),
        Value::Float(f) => PgBind::Float8(*f),
        Value::String(s) => PgBind::Text(s.clone()),
        Value::Bytes(b) => PgBind::Bytea(b.clone()),
        Value::Uuid(u) => PgBind::Uuid(*u),
        Value::DateTime(dt) => PgBind::Timestamp(*dt),
        Value::Date(d) => PgBind::Date(*d),
        Value::Json(j) => PgBind::Json(j.clone()),
    })
}

/// Bind a Value to a sqlx query
fn bind_value<'q>(query: PgQuery<'q>, value: &Value) -> OrmResult<PgQuery<'q>> {
    Ok(match pg_bind(value)? {
        PgBind::Bool(b) => query.bind(b),
        PgBind::Int8(i) => query.bind(i),
        PgBind::Float8(f) => query.bind(f),
        PgBind::Text(s) => query.bind(s),
        PgBind::Bytea(b) => query.bind(b),
        PgBind::Uuid(u) => query.bind(u),
        PgBind::Timestamp(dt) => query.bind(dt),
        PgBind::Date(d) => query.bind(d),
        PgBind::Json(j) => query.bind(j),
    })
}

fn row_to_attributes(row: &PgRow) -> OrmResult<Row> {
    row.columns()
        .iter()
        .map(|column| {
            Ok(AttributeItem::new(
                column.name(),
                postgres_value(row, column.ordinal())?,
            ))
        })
        .collect()
}

/// Convert a PostgreSQL column value to Value
fn postgres_value(row: &PgRow, index: usize) -> OrmResult<Value> {
    let type_name = row.columns()[index].type_info().name().to_string();

    let decode_error =
        |e: sqlx::Error| OrmError::Database(format!("Failed to decode {} column: {}", type_name, e));

    let value = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(index).map_err(decode_error)?.map(Value::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map_err(decode_error)?
            .map(|v| Value::Int(v.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map_err(decode_error)?
            .map(|v| Value::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(index).map_err(decode_error)?.map(Value::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map_err(decode_error)?
            .map(|v| Value::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index).map_err(decode_error)?.map(Value::Float),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index).map_err(decode_error)?.map(Value::Bytes),
        "UUID" => row.try_get::<Option<uuid::Uuid>, _>(index).map_err(decode_error)?.map(Value::Uuid),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map_err(decode_error)?
            .map(Value::DateTime),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map_err(decode_error)?
            .map(Value::from),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .map_err(decode_error)?
            .map(Value::Date),
        "JSON" | "JSONB" => row.try_get::<Option<JsonValue>, _>(index).map_err(decode_error)?.map(Value::Json),
        _ => row.try_get::<Option<String>, _>(index).map_err(decode_error)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_dates_bind_as_date_types() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let datetime = date.and_hms_opt(14, 51, 23).unwrap();

        assert_eq!(pg_bind(&Value::DateTime(datetime)).unwrap(), PgBind::Timestamp(datetime));
        assert_eq!(pg_bind(&Value::Date(date)).unwrap(), PgBind::Date(date));
        assert_eq!(pg_bind(&Value::from("x")).unwrap(), PgBind::Text("x".to_string()));
    }

    #[test]
    fn test_null_and_oversized_values_are_not_bound() {
        assert!(matches!(pg_bind(&Value::Null), Err(OrmError::Query(_))));
        assert!(matches!(pg_bind(&Value::UInt(u64::MAX)), Err(OrmError::Query(_))));
        assert_eq!(pg_bind(&Value::UInt(7)).unwrap(), PgBind::Int8(7));
    }
}
