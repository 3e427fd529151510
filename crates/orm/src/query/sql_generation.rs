//! Query Builder SQL generation
//!
//! [`QueryGrammar`] compiles a [`QueryBuilder`] into PostgreSQL flavoured SQL
//! with `$n` placeholders and the matching parameter list.

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::{AttributeItem, Value};

/// Compiles queries for a connection and carries its date storage format
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGrammar {
    date_format: String,
}

impl Default for QueryGrammar {
    fn default() -> Self {
        Self::new(tinyorm_core::config::DEFAULT_DATE_FORMAT)
    }
}

impl QueryGrammar {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Format used to store date columns on this connection
    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Build SELECT SQL with parameters
    pub fn compile_select(&self, query: &QueryBuilder) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.compile_select_into(query, &mut params);
        (sql, params)
    }

    /// Compile a SELECT numbering its placeholders after `params`, used for subqueries
    fn compile_select_into(&self, query: &QueryBuilder, params: &mut Vec<Value>) -> String {
        let mut sql = String::new();

        if query.distinct {
            sql.push_str("SELECT DISTINCT ");
        } else {
            sql.push_str("SELECT ");
        }

        if query.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&query.select_fields.join(", "));
        }

        if let Some(table) = &query.from_table {
            sql.push_str(" FROM ");
            sql.push_str(table);
        }

        for join in &query.joins {
            sql.push(' ');
            sql.push_str(&join.join_type.to_string());
            sql.push(' ');
            sql.push_str(&join.table);
            sql.push_str(" ON ");
            for (i, (left, right)) in join.on_conditions.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" AND ");
                }
                sql.push_str(&format!("{} = {}", left, right));
            }
        }

        self.compile_wheres(query, &mut sql, params);

        if !query.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&query.group_by.join(", "));
        }

        if let Some((operator, count)) = &query.having_count {
            sql.push_str(&format!(" HAVING COUNT(*) {} ", operator));
            sql.push_str(&parameter(&Value::Int(*count), params));
        }

        if !query.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = query.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = query.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Build INSERT SQL with parameters.
    ///
    /// NULL values are written inline and never bound.
    pub fn compile_insert(&self, query: &QueryBuilder, values: &[AttributeItem]) -> (String, Vec<Value>) {
        let table = query.from_table.as_deref().unwrap_or_default();

        if values.is_empty() {
            return (format!("INSERT INTO {} DEFAULT VALUES", table), Vec::new());
        }

        let mut params = Vec::new();
        let columns: Vec<&str> = values.iter().map(|item| item.key.as_str()).collect();
        let placeholders: Vec<String> = values
            .iter()
            .map(|item| parameter(&item.value, &mut params))
            .collect();

        (
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        )
    }

    /// Build INSERT SQL that returns the generated key
    pub fn compile_insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &[AttributeItem],
        sequence: Option<&str>,
    ) -> (String, Vec<Value>) {
        let (sql, params) = self.compile_insert(query, values);
        (
            format!("{} RETURNING {}", sql, sequence.unwrap_or("id")),
            params,
        )
    }

    /// Build UPDATE SQL with parameters
    pub fn compile_update(&self, query: &QueryBuilder, values: &[AttributeItem]) -> (String, Vec<Value>) {
        let table = query.from_table.as_deref().unwrap_or_default();
        let mut params = Vec::new();

        let sets: Vec<String> = values
            .iter()
            .map(|item| format!("{} = {}", unqualified(&item.key), parameter(&item.value, &mut params)))
            .collect();

        let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
        self.compile_wheres(query, &mut sql, &mut params);

        (sql, params)
    }

    /// Build DELETE SQL with parameters
    pub fn compile_delete(&self, query: &QueryBuilder) -> (String, Vec<Value>) {
        let table = query.from_table.as_deref().unwrap_or_default();
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", table);
        self.compile_wheres(query, &mut sql, &mut params);

        (sql, params)
    }

    fn compile_wheres(&self, query: &QueryBuilder, sql: &mut String, params: &mut Vec<Value>) {
        if query.where_conditions.is_empty() {
            return;
        }

        sql.push_str(" WHERE ");
        self.compile_conditions(&query.where_conditions, sql, params);
    }

    fn compile_conditions(&self, conditions: &[WhereCondition], sql: &mut String, params: &mut Vec<Value>) {
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(&condition.boolean.to_string());
                sql.push(' ');
            }

            match condition.operator {
                QueryOperator::Nested => {
                    sql.push('(');
                    self.compile_conditions(&condition.nested, sql, params);
                    sql.push(')');
                }
                QueryOperator::In | QueryOperator::NotIn => {
                    if let Some(subquery) = &condition.subquery {
                        sql.push_str(&format!("{} {} (", condition.column, condition.operator));
                        sql.push_str(&self.compile_select_into(subquery, params));
                        sql.push(')');
                        continue;
                    }
                    if condition.values.is_empty() {
                        // An empty IN list matches nothing, NOT IN matches everything
                        let literal = if condition.operator == QueryOperator::In { "0 = 1" } else { "1 = 1" };
                        sql.push_str(literal);
                        continue;
                    }
                    let items: Vec<String> = condition.values.iter().map(|value| parameter(value, params)).collect();
                    sql.push_str(&format!("{} {} ({})", condition.column, condition.operator, items.join(", ")));
                }
                QueryOperator::IsNull | QueryOperator::IsNotNull => {
                    sql.push_str(&condition.column);
                    sql.push(' ');
                    sql.push_str(&condition.operator.to_string());
                }
                _ => {
                    let value = condition.value.clone().unwrap_or(Value::Null);
                    sql.push_str(&format!("{} {} {}", condition.column, condition.operator, parameter(&value, params)));
                }
            }
        }
    }
}

/// Placeholder for `value`, NULL is inlined so drivers never bind an untyped null
fn parameter(value: &Value, params: &mut Vec<Value>) -> String {
    if value.is_null() {
        return "NULL".to_string();
    }
    params.push(value.clone());
    format!("${}", params.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::attributes;

    #[test]
    fn test_compile_select() {
        let query = QueryBuilder::table("torrents")
            .select("torrents.id, torrents.name")
            .where_eq("torrents.size", 10)
            .or_where_in("torrents.id", vec![1, 2])
            .order_by_desc("torrents.id")
            .limit(5);

        let (sql, params) = QueryGrammar::default().compile_select(&query);
        assert_eq!(
            sql,
            "SELECT torrents.id, torrents.name FROM torrents WHERE torrents.size = $1 OR torrents.id IN ($2, $3) ORDER BY torrents.id DESC LIMIT 5"
        );
        assert_eq!(params, vec![Value::Int(10), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_compile_select_with_join() {
        let query = QueryBuilder::table("tags")
            .join("tagged", "tags.id", "tagged.tag_id")
            .where_in("tagged.torrent_id", vec![7]);

        let (sql, _) = QueryGrammar::default().compile_select(&query);
        assert_eq!(
            sql,
            "SELECT * FROM tags INNER JOIN tagged ON tags.id = tagged.tag_id WHERE tagged.torrent_id IN ($1)"
        );
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let query = QueryBuilder::table("files").where_in::<i64>("torrent_id", vec![]);
        let (sql, params) = QueryGrammar::default().compile_select(&query);
        assert_eq!(sql, "SELECT * FROM files WHERE 0 = 1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_compile_insert_get_id() {
        let query = QueryBuilder::table("torrents");
        let values = attributes([("name", "test"), ("note", "x")]);
        let (sql, params) = QueryGrammar::default().compile_insert_get_id(&query, &values, Some("id"));
        assert_eq!(sql, "INSERT INTO torrents (name, note) VALUES ($1, $2) RETURNING id");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_compile_update_numbers_where_after_sets() {
        let query = QueryBuilder::table("torrents").where_eq("id", 3);
        let values = attributes([("name", "renamed")]);
        let (sql, params) = QueryGrammar::default().compile_update(&query, &values);
        assert_eq!(sql, "UPDATE torrents SET name = $1 WHERE id = $2");
        assert_eq!(params, vec![Value::from("renamed"), Value::Int(3)]);
    }

    #[test]
    fn test_null_values_are_inlined_not_bound() {
        let query = QueryBuilder::table("torrents").where_eq("id", 3);
        let values = attributes([("name", Value::from("renamed")), ("note", Value::Null)]);

        let (sql, params) = QueryGrammar::default().compile_update(&query, &values);
        assert_eq!(sql, "UPDATE torrents SET name = $1, note = NULL WHERE id = $2");
        assert_eq!(params, vec![Value::from("renamed"), Value::Int(3)]);

        let (sql, params) = QueryGrammar::default().compile_insert(&QueryBuilder::table("torrents"), &values);
        assert_eq!(sql, "INSERT INTO torrents (name, note) VALUES ($1, NULL)");
        assert!(!params.iter().any(Value::is_null));
    }

    #[test]
    fn test_date_values_stay_typed_in_bindings() {
        let added_on = chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|date| date.and_hms_opt(14, 51, 23))
            .unwrap();
        let values = attributes([("added_on", Value::DateTime(added_on))]);

        let (sql, params) = QueryGrammar::default().compile_insert(&QueryBuilder::table("torrents"), &values);
        assert_eq!(sql, "INSERT INTO torrents (added_on) VALUES ($1)");
        assert_eq!(params, vec![Value::DateTime(added_on)]);
    }

    #[test]
    fn test_compile_subquery_and_nested_groups() {
        let files = QueryBuilder::table("torrent_previewable_files")
            .select("torrent_previewable_files.torrent_id")
            .where_eq("torrent_previewable_files.size", 5)
            .group_by("torrent_previewable_files.torrent_id")
            .having_count(QueryOperator::GreaterThanOrEqual, 2);
        let query = QueryBuilder::table("torrents")
            .where_nested(|q| q.where_eq("torrents.id", 1).or_where_eq("torrents.id", 2))
            .where_in_sub("torrents.id", files)
            .where_eq("torrents.name", "x");

        let (sql, params) = QueryGrammar::default().compile_select(&query);
        assert_eq!(
            sql,
            "SELECT * FROM torrents WHERE (torrents.id = $1 OR torrents.id = $2) AND torrents.id IN (SELECT torrent_previewable_files.torrent_id FROM torrent_previewable_files WHERE torrent_previewable_files.size = $3 GROUP BY torrent_previewable_files.torrent_id HAVING COUNT(*) >= $4) AND torrents.name = $5"
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[3], Value::Int(2));
    }

    #[test]
    fn test_compile_delete() {
        let query = QueryBuilder::table("torrents").where_eq("id", 3);
        let (sql, _) = QueryGrammar::default().compile_delete(&query);
        assert_eq!(sql, "DELETE FROM torrents WHERE id = $1");
    }

    #[test]
    fn test_date_format() {
        assert_eq!(QueryGrammar::default().date_format(), "%Y-%m-%d %H:%M:%S");
        assert_eq!(QueryGrammar::new("%d.%m.%Y").date_format(), "%d.%m.%Y");
    }
}
