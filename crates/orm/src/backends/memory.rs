//! In-memory Backend Implementation
//!
//! Evaluates [`QueryBuilder`] structures directly against tables held in
//! process. Every executed statement is compiled through the connection's
//! [`QueryGrammar`] and recorded in a query log so callers can assert on the
//! number and shape of the statements a model operation issued.
//!
//! Date and timestamp values are stored as text in the grammar's date
//! format, the way a text date column keeps them. Bindings in the log keep
//! their types.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::core::*;
use crate::error::{ConnectionError, OrmResult};
use crate::query::{
    unqualified, JoinType, OrderDirection, QueryBuilder, QueryGrammar, QueryOperator,
    SelectColumn, WhereBoolean, WhereCondition,
};

/// Kind of statement recorded in the query log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// A statement executed by a [`MemoryConnection`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedQuery {
    pub kind: StatementKind,
    pub table: String,
    pub sql: String,
    pub bindings: Vec<Value>,
}

/// Failure injected into a table's affecting statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Insert, update and delete fail with a database error
    Statement,
    /// `insert_get_id` succeeds but reports no generated id
    ZeroId,
}

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Row>,
    next_id: u64,
}

impl MemoryTable {
    fn observe_id(&mut self, id: u64) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, MemoryTable>,
    log: Vec<LoggedQuery>,
    failures: HashMap<String, InjectedFailure>,
}

/// A joined row during select evaluation: `(table, column, value)` triples
type Combined = Vec<(String, String, Value)>;

/// In-process connection used by tests and embedded tools
#[derive(Debug)]
pub struct MemoryConnection {
    name: String,
    grammar: QueryGrammar,
    state: Mutex<MemoryState>,
}

impl MemoryConnection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grammar: QueryGrammar::default(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Use a different date storage format for this connection
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.grammar = QueryGrammar::new(format);
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves the tables in a consistent
        // state, every mutation below is a single push or retain
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create an empty table, existing tables are left untouched
    pub fn create_table(&self, table: &str) {
        self.state().tables.entry(table.to_string()).or_default();
    }

    /// Insert rows without logging them, auto incrementing `id` when absent
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut state = self.state();
        let memory_table = state.tables.entry(table.to_string()).or_default();
        for mut row in rows {
            let id = assign_id(memory_table, &mut row, "id");
            memory_table.observe_id(id);
            memory_table.rows.push(row);
        }
    }

    /// Snapshot of a table's rows in insertion order
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Number of rows in `table`
    pub fn row_count(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, |t| t.rows.len())
    }

    /// Remove every row from every table and clear the query log
    pub fn truncate_all(&self) {
        let mut state = self.state();
        state.tables.clear();
        state.log.clear();
    }

    /// Statements executed since the log was last reset
    pub fn query_log(&self) -> Vec<LoggedQuery> {
        self.state().log.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state().log.len()
    }

    /// Number of logged statements of the given kind
    pub fn count_of(&self, kind: StatementKind) -> usize {
        self.state().log.iter().filter(|q| q.kind == kind).count()
    }

    pub fn reset_query_log(&self) {
        self.state().log.clear();
    }

    /// Make affecting statements against `table` fail
    pub fn fail_on(&self, table: &str, failure: InjectedFailure) {
        self.state().failures.insert(table.to_string(), failure);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    fn table_name(query: &QueryBuilder) -> OrmResult<String> {
        query
            .get_from()
            .map(str::to_string)
            .ok_or_else(|| ConnectionError::Statement("query has no table".to_string()).into())
    }

    fn check_failure(state: &MemoryState, table: &str, sql: &str) -> OrmResult<()> {
        if state.failures.get(table) == Some(&InjectedFailure::Statement) {
            tracing::debug!("Injected failure for statement: {}", sql);
            return Err(ConnectionError::Statement(format!("injected failure on '{}'", table)).into());
        }
        Ok(())
    }

    /// Row as it is stored, typed dates become text in the date format
    fn stored_row(&self, values: &[AttributeItem]) -> Row {
        values
            .iter()
            .map(|item| AttributeItem {
                key: unqualified(&item.key).to_string(),
                value: self.stored_value(&item.value),
            })
            .collect()
    }

    fn stored_value(&self, value: &Value) -> Value {
        let format = self.grammar.date_format();
        match value {
            Value::DateTime(datetime) => Value::String(datetime.format(format).to_string()),
            Value::Date(date) => match date.and_hms_opt(0, 0, 0) {
                Some(datetime) => Value::String(datetime.format(format).to_string()),
                None => value.clone(),
            },
            other => other.clone(),
        }
    }

    fn log(state: &mut MemoryState, kind: StatementKind, table: &str, (sql, bindings): (String, Vec<Value>)) -> String {
        tracing::debug!(target: "tinyorm::memory", "{} {:?}", sql, bindings);
        state.log.push(LoggedQuery {
            kind,
            table: table.to_string(),
            sql: sql.clone(),
            bindings,
        });
        sql
    }
}

impl Connection for MemoryConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn grammar(&self) -> &QueryGrammar {
        &self.grammar
    }

    fn select(&self, query: &QueryBuilder) -> OrmResult<Vec<Row>> {
        let table = Self::table_name(query)?;
        let mut state = self.state();
        Self::log(&mut state, StatementKind::Select, &table, self.grammar.compile_select(query));

        Ok(evaluate(&state, query))
    }

    fn insert(&self, query: &QueryBuilder, values: &[AttributeItem]) -> OrmResult<StatementResult> {
        let table = Self::table_name(query)?;
        let mut state = self.state();
        let sql = Self::log(&mut state, StatementKind::Insert, &table, self.grammar.compile_insert(query, values));
        Self::check_failure(&state, &table, &sql)?;

        let memory_table = state.tables.entry(table).or_default();
        let row = self.stored_row(values);
        if let Some(id) = row.iter().find(|i| i.key == "id").and_then(|i| i.value.as_u64()) {
            memory_table.observe_id(id);
        }
        memory_table.rows.push(row);

        Ok(StatementResult {
            affected_rows: 1,
            sql,
        })
    }

    fn insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &[AttributeItem],
        sequence: Option<&str>,
    ) -> OrmResult<u64> {
        let table = Self::table_name(query)?;
        let key = sequence.unwrap_or("id");
        let mut state = self.state();
        let sql = Self::log(
            &mut state,
            StatementKind::Insert,
            &table,
            self.grammar.compile_insert_get_id(query, values, Some(key)),
        );
        Self::check_failure(&state, &table, &sql)?;
        let zero_id = state.failures.get(&table) == Some(&InjectedFailure::ZeroId);

        let memory_table = state.tables.entry(table).or_default();
        let mut row = self.stored_row(values);
        let id = assign_id(memory_table, &mut row, key);
        memory_table.observe_id(id);
        memory_table.rows.push(row);

        Ok(if zero_id { 0 } else { id })
    }

    fn update(&self, query: &QueryBuilder, values: &[AttributeItem]) -> OrmResult<StatementResult> {
        let table = Self::table_name(query)?;
        let mut state = self.state();
        let sql = Self::log(&mut state, StatementKind::Update, &table, self.grammar.compile_update(query, values));
        Self::check_failure(&state, &table, &sql)?;

        let wheres = resolve_conditions(&state, query.get_wheres());
        let values = self.stored_row(values);
        let mut affected_rows = 0;
        if let Some(memory_table) = state.tables.get_mut(&table) {
            for row in memory_table.rows.iter_mut() {
                if !matches_wheres(&tag_row(&table, row), &wheres) {
                    continue;
                }
                for item in &values {
                    match row.iter_mut().find(|existing| existing.key == item.key) {
                        Some(existing) => existing.value = item.value.clone(),
                        None => row.push(item.clone()),
                    }
                }
                affected_rows += 1;
            }
        }

        Ok(StatementResult { affected_rows, sql })
    }

    fn delete(&self, query: &QueryBuilder) -> OrmResult<StatementResult> {
        let table = Self::table_name(query)?;
        let mut state = self.state();
        let sql = Self::log(&mut state, StatementKind::Delete, &table, self.grammar.compile_delete(query));
        Self::check_failure(&state, &table, &sql)?;

        let wheres = resolve_conditions(&state, query.get_wheres());
        let mut affected_rows = 0;
        if let Some(memory_table) = state.tables.get_mut(&table) {
            let before = memory_table.rows.len();
            memory_table
                .rows
                .retain(|row| !matches_wheres(&tag_row(&table, row), &wheres));
            affected_rows = (before - memory_table.rows.len()) as u64;
        }

        Ok(StatementResult { affected_rows, sql })
    }
}

/// Run a select against the stored tables
fn evaluate(state: &MemoryState, query: &QueryBuilder) -> Vec<Row> {
    let Some(table) = query.get_from() else {
        return Vec::new();
    };

    let mut combined: Vec<Combined> = match state.tables.get(table) {
        Some(t) => t.rows.iter().map(|row| tag_row(table, row)).collect(),
        None => Vec::new(),
    };

    for join in query.get_joins() {
        let join_rows: Vec<Combined> = state
            .tables
            .get(&join.table)
            .map(|t| t.rows.iter().map(|row| tag_row(&join.table, row)).collect())
            .unwrap_or_default();

        let mut joined = Vec::new();
        for left in combined {
            let mut matched = false;
            for right in &join_rows {
                let mut candidate = left.clone();
                candidate.extend(right.iter().cloned());
                let on = join.on_conditions.iter().all(|(l, r)| {
                    lookup(&candidate, l).loosely_eq(&lookup(&candidate, r))
                });
                if on {
                    matched = true;
                    joined.push(candidate);
                }
            }
            if !matched && join.join_type == JoinType::Left {
                joined.push(left);
            }
        }
        combined = joined;
    }

    let wheres = resolve_conditions(state, query.get_wheres());
    combined.retain(|row| matches_wheres(row, &wheres));
    combined = group(combined, query.get_groups(), query.get_having_count());

    for (column, direction) in query.get_orders().iter().rev() {
        combined.sort_by(|a, b| {
            let ordering = lookup(a, column)
                .compare(&lookup(b, column))
                .unwrap_or(std::cmp::Ordering::Equal);
            match direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            }
        });
    }

    let mut rows: Vec<Row> = combined
        .iter()
        .map(|row| project(row, table, query.get_columns()))
        .collect();

    if query.is_distinct() {
        let mut unique: Vec<Row> = Vec::with_capacity(rows.len());
        for row in rows {
            if !unique.contains(&row) {
                unique.push(row);
            }
        }
        rows = unique;
    }

    let offset = query.get_offset().unwrap_or(0).max(0) as usize;
    let rows = rows.into_iter().skip(offset);
    match query.get_limit() {
        Some(limit) => rows.take(limit.max(0) as usize).collect(),
        None => rows.collect(),
    }
}

/// Replace `IN (SELECT ...)` sources with the first column of their rows
fn resolve_conditions(state: &MemoryState, conditions: &[WhereCondition]) -> Vec<WhereCondition> {
    conditions
        .iter()
        .map(|condition| {
            let mut resolved = condition.clone();
            if let Some(subquery) = resolved.subquery.take() {
                resolved.values = evaluate(state, &subquery)
                    .into_iter()
                    .filter_map(|row| row.into_iter().next().map(|item| item.value))
                    .collect();
            }
            if !resolved.nested.is_empty() {
                resolved.nested = resolve_conditions(state, &resolved.nested);
            }
            resolved
        })
        .collect()
}

/// Collapse rows to the first row of each group, filtered by the group size
fn group(rows: Vec<Combined>, columns: &[String], having: Option<&(QueryOperator, i64)>) -> Vec<Combined> {
    if columns.is_empty() && having.is_none() {
        return rows;
    }

    let mut groups: Vec<(Vec<Option<String>>, Combined, i64)> = Vec::new();
    for row in rows {
        let key: Vec<Option<String>> = columns.iter().map(|column| lookup(&row, column).key_string()).collect();
        match groups.iter_mut().find(|(existing, _, _)| *existing == key) {
            Some((_, _, count)) => *count += 1,
            None => groups.push((key, row, 1)),
        }
    }

    groups
        .into_iter()
        .filter(|(_, _, count)| match having {
            Some((operator, target)) => operator.compare_counts(*count, *target),
            None => true,
        })
        .map(|(_, row, _)| row)
        .collect()
}

/// Use the row's own key when present, otherwise take the next sequence value
fn assign_id(table: &mut MemoryTable, row: &mut Row, key: &str) -> u64 {
    let next = table.next_id.max(1);
    match row.iter_mut().find(|item| item.key == key) {
        Some(item) if !item.value.is_null() => item.value.as_u64().unwrap_or(0),
        Some(item) => {
            item.value = Value::UInt(next);
            next
        }
        None => {
            row.push(AttributeItem::new(key, Value::UInt(next)));
            next
        }
    }
}

fn tag_row(table: &str, row: &Row) -> Combined {
    row.iter()
        .map(|item| (table.to_string(), item.key.clone(), item.value.clone()))
        .collect()
}

/// Resolve `column` or `table.column` against a combined row, missing is NULL
fn lookup(row: &Combined, column: &str) -> Value {
    let found = match column.split_once('.') {
        Some((table, name)) => row.iter().find(|(t, c, _)| t == table && c == name),
        None => row.iter().find(|(_, c, _)| c == column),
    };
    found.map(|(_, _, v)| v.clone()).unwrap_or(Value::Null)
}

/// AND binds tighter than OR, as in SQL
fn matches_wheres(row: &Combined, wheres: &[WhereCondition]) -> bool {
    if wheres.is_empty() {
        return true;
    }

    let mut any_group = false;
    let mut group = true;
    for (i, condition) in wheres.iter().enumerate() {
        if i > 0 && condition.boolean == WhereBoolean::Or {
            any_group |= group;
            group = true;
        }
        group = group && matches_condition(row, condition);
    }
    any_group || group
}

fn matches_condition(row: &Combined, condition: &WhereCondition) -> bool {
    if condition.operator == QueryOperator::Nested {
        return matches_wheres(row, &condition.nested);
    }

    let actual = lookup(row, &condition.column);
    let expected = condition.value.clone().unwrap_or(Value::Null);

    let ordering = || {
        if actual.is_null() || expected.is_null() {
            None
        } else {
            actual.compare(&expected)
        }
    };

    match condition.operator {
        QueryOperator::Equal => actual.loosely_eq(&expected),
        QueryOperator::NotEqual => {
            !actual.is_null() && !expected.is_null() && !actual.loosely_eq(&expected)
        }
        QueryOperator::GreaterThan => ordering() == Some(std::cmp::Ordering::Greater),
        QueryOperator::GreaterThanOrEqual => {
            matches!(ordering(), Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal))
        }
        QueryOperator::LessThan => ordering() == Some(std::cmp::Ordering::Less),
        QueryOperator::LessThanOrEqual => {
            matches!(ordering(), Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal))
        }
        QueryOperator::Like | QueryOperator::NotLike => {
            let matched = match (actual.key_string(), expected.as_str()) {
                (Some(text), Some(pattern)) => like(&text, pattern),
                _ => return false,
            };
            matched == (condition.operator == QueryOperator::Like)
        }
        QueryOperator::In => condition.values.iter().any(|v| actual.loosely_eq(v)),
        // A NULL in the list makes NOT IN unknown for every row
        QueryOperator::NotIn => {
            !actual.is_null()
                && !condition.values.iter().any(|v| v.is_null() || actual.loosely_eq(v))
        }
        QueryOperator::IsNull => actual.is_null(),
        QueryOperator::IsNotNull => !actual.is_null(),
        QueryOperator::Nested => false,
    }
}

/// SQL LIKE with `%` and `_` wildcards, case sensitive
fn like(text: &str, pattern: &str) -> bool {
    fn matches(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some(('%', rest)) => (0..=text.len()).any(|i| matches(&text[i..], rest)),
            Some(('_', rest)) => !text.is_empty() && matches(&text[1..], rest),
            Some((c, rest)) => text.first() == Some(c) && matches(&text[1..], rest),
        }
    }

    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&text, &pattern)
}

fn project(row: &Combined, base_table: &str, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row
            .iter()
            .map(|(_, c, v)| AttributeItem::new(c.clone(), v.clone()))
            .collect();
    }

    let mut projected = Row::new();
    for expression in columns {
        let select = SelectColumn::parse(expression);
        if select.column == "*" || select.column.ends_with(".*") {
            let table = select.column.strip_suffix(".*").unwrap_or(base_table);
            let wildcard_all = select.column == "*";
            projected.extend(
                row.iter()
                    .filter(|(t, _, _)| wildcard_all || t == table)
                    .map(|(_, c, v)| AttributeItem::new(c.clone(), v.clone())),
            );
            continue;
        }
        projected.push(AttributeItem::new(
            select.output_name(),
            lookup(row, &select.column),
        ));
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::attributes;

    fn connection() -> MemoryConnection {
        let connection = MemoryConnection::new("default");
        connection.seed(
            "torrents",
            vec![
                attributes([("name", Value::from("alpha")), ("size", Value::from(10))]),
                attributes([("name", Value::from("beta")), ("size", Value::from(20))]),
                attributes([("name", Value::from("gamma")), ("size", Value::Null)]),
            ],
        );
        connection
    }

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .find(|i| i.key == "name")
                    .and_then(|i| i.value.as_str().map(str::to_string))
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn test_seed_assigns_ids() {
        let connection = connection();
        let rows = connection.rows("torrents");
        assert_eq!(rows[0][2], AttributeItem::new("id", Value::UInt(1)));
        assert_eq!(rows[2][2], AttributeItem::new("id", Value::UInt(3)));
        assert_eq!(connection.query_count(), 0);
    }

    #[test]
    fn test_select_with_wheres_and_order() {
        let connection = connection();
        let query = QueryBuilder::table("torrents")
            .where_gt("size", 5)
            .order_by_desc("size");

        let rows = connection.select(&query).unwrap();
        assert_eq!(names(&rows), ["beta", "alpha"]);
        assert_eq!(connection.count_of(StatementKind::Select), 1);
    }

    #[test]
    fn test_or_has_lower_precedence_than_and() {
        let connection = connection();
        let query = QueryBuilder::table("torrents")
            .where_eq("name", "alpha")
            .where_eq("size", 20)
            .or_where_null("size");

        let rows = connection.select(&query).unwrap();
        assert_eq!(names(&rows), ["gamma"]);
    }

    #[test]
    fn test_like_and_in() {
        let connection = connection();
        let rows = connection
            .select(&QueryBuilder::table("torrents").where_like("name", "%a"))
            .unwrap();
        assert_eq!(names(&rows), ["alpha", "beta", "gamma"]);

        let rows = connection
            .select(&QueryBuilder::table("torrents").where_in("id", vec![2, 3]))
            .unwrap();
        assert_eq!(names(&rows), ["beta", "gamma"]);
    }

    #[test]
    fn test_join_with_alias() {
        let connection = connection();
        connection.seed(
            "tags",
            vec![attributes([("name", Value::from("linux"))])],
        );
        connection.seed(
            "tagged",
            vec![attributes([
                ("torrent_id", Value::from(2)),
                ("tag_id", Value::from(1)),
                ("active", Value::from(true)),
            ])],
        );

        let query = QueryBuilder::table("tags")
            .select("tags.*, tagged.torrent_id as pivot_torrent_id, tagged.active as pivot_active")
            .join("tagged", "tags.id", "tagged.tag_id")
            .where_in("tagged.torrent_id", vec![2]);

        let rows = connection.select(&query).unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&str> = rows[0].iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["name", "id", "pivot_torrent_id", "pivot_active"]);
    }

    #[test]
    fn test_insert_get_id_continues_sequence() {
        let connection = connection();
        let id = connection
            .insert_get_id(
                &QueryBuilder::table("torrents"),
                &attributes([("name", "delta")]),
                Some("id"),
            )
            .unwrap();
        assert_eq!(id, 4);
        assert_eq!(connection.row_count("torrents"), 4);
    }

    #[test]
    fn test_update_and_delete() {
        let connection = connection();
        let result = connection
            .update(
                &QueryBuilder::table("torrents").where_eq("id", 1),
                &attributes([("name", "renamed")]),
            )
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert!(result.sql.starts_with("UPDATE torrents SET name = $1"));

        let result = connection
            .delete(&QueryBuilder::table("torrents").where_null("size"))
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(names(&connection.rows("torrents")), ["renamed", "beta"]);
    }

    #[test]
    fn test_injected_failures() {
        let connection = connection();
        connection.fail_on("torrents", InjectedFailure::Statement);
        let result = connection.delete(&QueryBuilder::table("torrents"));
        assert!(matches!(result, Err(crate::error::ModelError::Database(_))));

        connection.fail_on("torrents", InjectedFailure::ZeroId);
        let id = connection
            .insert_get_id(&QueryBuilder::table("torrents"), &attributes([("name", "x")]), None)
            .unwrap();
        assert_eq!(id, 0);

        connection.clear_failures();
        assert_eq!(connection.row_count("torrents"), 4);
    }

    #[test]
    fn test_limit_offset_and_distinct() {
        let connection = connection();
        let rows = connection
            .select(&QueryBuilder::table("torrents").order_by("id").offset(1).limit(1))
            .unwrap();
        assert_eq!(names(&rows), ["beta"]);

        connection.seed("torrents", vec![attributes([("name", "beta"), ("size", "x")])]);
        let rows = connection
            .select(&QueryBuilder::table("torrents").select("name").distinct())
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_dates_are_stored_as_text() {
        let connection = MemoryConnection::new("default");
        let added_on = chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|date| date.and_hms_opt(14, 51, 23))
            .unwrap();
        connection
            .insert(&QueryBuilder::table("torrents"), &attributes([("added_on", Value::DateTime(added_on))]))
            .unwrap();

        assert_eq!(
            connection.rows("torrents")[0][0],
            AttributeItem::new("added_on", "2021-01-01 14:51:23")
        );
        assert_eq!(connection.query_log()[0].bindings, vec![Value::DateTime(added_on)]);
    }

    #[test]
    fn test_subquery_with_group_and_having() {
        let connection = connection();
        connection.seed(
            "files",
            vec![
                attributes([("torrent_id", 1), ("size", 5)]),
                attributes([("torrent_id", 1), ("size", 6)]),
                attributes([("torrent_id", 2), ("size", 7)]),
            ],
        );
        let files = |operator: QueryOperator, count: i64| {
            QueryBuilder::table("files")
                .select("files.torrent_id")
                .group_by("files.torrent_id")
                .having_count(operator, count)
        };

        let rows = connection
            .select(&QueryBuilder::table("torrents").where_in_sub("id", files(QueryOperator::GreaterThanOrEqual, 2)))
            .unwrap();
        assert_eq!(names(&rows), ["alpha"]);

        let rows = connection
            .select(&QueryBuilder::table("torrents").where_not_in_sub("id", files(QueryOperator::GreaterThanOrEqual, 1)))
            .unwrap();
        assert_eq!(names(&rows), ["gamma"]);
    }

    #[test]
    fn test_nested_group_binds_before_and() {
        let connection = connection();
        let query = QueryBuilder::table("torrents")
            .where_nested(|q| q.where_eq("name", "alpha").or_where_eq("name", "beta"))
            .where_eq("size", 20);

        let rows = connection.select(&query).unwrap();
        assert_eq!(names(&rows), ["beta"]);
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("alpha", "a%a"));
        assert!(like("alpha", "_lpha"));
        assert!(!like("alpha", "A%"));
        assert!(like("", "%"));
    }
}
