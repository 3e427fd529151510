//! Database testing utilities
//!
//! Provides an isolated in-memory database per test:
//! - The torrent fixture data seeded on demand
//! - Query log counters for asserting on issued statements
//! - Record assertion helpers
//! - Failure injection passthroughs

use std::sync::Arc;

use tinyorm::{
    set_connection_resolver, AttributeItem, ConnectionResolver, DatabaseManager, InjectedFailure,
    LoggedQuery, MemoryConnection, Model, QueryMethods, Row, StatementKind, TinyBuilder, Value,
};
use tinyorm_core::DEFAULT_CONNECTION_NAME;

/// Test database backed by its own [`MemoryConnection`]
#[derive(Clone)]
pub struct TestDatabase {
    connection: Arc<MemoryConnection>,
    resolver: Arc<dyn ConnectionResolver>,
}

impl TestDatabase {
    /// Create an empty test database
    pub fn new() -> Self {
        let connection = Arc::new(MemoryConnection::new(DEFAULT_CONNECTION_NAME));
        let resolver: Arc<dyn ConnectionResolver> = Arc::new(
            DatabaseManager::new(DEFAULT_CONNECTION_NAME).with_connection(connection.clone()),
        );
        Self { connection, resolver }
    }

    /// Create a test database holding the torrent fixture data, with a
    /// clean query log
    pub fn seeded() -> Self {
        let database = Self::new();
        database.seed_torrents();
        database.reset_query_log();
        database
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &Arc<MemoryConnection> {
        &self.connection
    }

    /// Resolver to hand to models, see [`QueryMethods::on`]
    pub fn resolver(&self) -> Arc<dyn ConnectionResolver> {
        self.resolver.clone()
    }

    /// Builder for `M` bound to this database
    pub fn query<M: Model>(&self) -> TinyBuilder<M> {
        M::on(self.resolver())
    }

    /// A new `M` bound to this database
    pub fn model<M: Model>(&self) -> M {
        let mut model = M::default();
        model.set_resolver(self.resolver());
        model
    }

    /// Make this database the process wide connection resolver.
    ///
    /// Tests doing this share global state and must run serially.
    pub fn install_global(&self) {
        set_connection_resolver(self.resolver());
    }

    /// Insert raw rows without logging them
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.connection.seed(table, rows);
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.connection.rows(table)
    }

    /// Check if a record matching every condition exists
    pub fn record_exists(&self, table: &str, conditions: &[(&str, Value)]) -> bool {
        self.count_records(table, conditions) > 0
    }

    /// Count records in a table matching every condition
    pub fn count_records(&self, table: &str, conditions: &[(&str, Value)]) -> usize {
        self.rows(table)
            .iter()
            .filter(|row| {
                conditions.iter().all(|(column, expected)| {
                    column_value(row, column).is_some_and(|value| value.loosely_eq(expected))
                })
            })
            .count()
    }

    /// Value of `column` in the row of `table` whose `id` is `id`
    pub fn column(&self, table: &str, id: u64, column: &str) -> Option<Value> {
        self.rows(table)
            .iter()
            .find(|row| column_value(row, "id").and_then(Value::as_u64) == Some(id))
            .and_then(|row| column_value(row, column).cloned())
    }

    pub fn query_log(&self) -> Vec<LoggedQuery> {
        self.connection.query_log()
    }

    /// Number of statements executed since the last reset
    pub fn query_count(&self) -> usize {
        self.connection.query_count()
    }

    pub fn count_of(&self, kind: StatementKind) -> usize {
        self.connection.count_of(kind)
    }

    pub fn reset_query_log(&self) {
        self.connection.reset_query_log();
    }

    /// Make affecting statements on `table` fail
    pub fn fail_on(&self, table: &str, failure: InjectedFailure) {
        self.connection.fail_on(table, failure);
    }

    pub fn clear_failures(&self) {
        self.connection.clear_failures();
    }

    /// Empty every table
    pub fn cleanup(&self) {
        self.connection.truncate_all();
        self.connection.reset_query_log();
    }

    /// Seed the torrent fixture tables
    pub fn seed_torrents(&self) {
        self.seed("torrents", seed::torrents());
        self.seed("torrent_previewable_files", seed::torrent_previewable_files());
        self.seed(
            "torrent_previewable_file_properties",
            seed::torrent_previewable_file_properties(),
        );
        self.seed("torrent_peers", seed::torrent_peers());
        self.seed("torrent_tags", seed::torrent_tags());
        self.seed("tag_torrent", seed::tag_torrent());
        self.seed("users", seed::users());
        self.seed("user_phones", seed::user_phones());
        tracing::debug!("Seeded torrent fixture tables");
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn column_value<'a>(row: &'a [AttributeItem], column: &str) -> Option<&'a Value> {
    row.iter().find(|item| item.key == column).map(|item| &item.value)
}

/// Fixture rows
pub mod seed {
    use tinyorm::{AttributeItem, Row, Value};

    const CREATED_AT: &str = "2021-01-01 14:51:23";
    const UPDATED_AT: &str = "2021-01-01 18:46:31";

    fn timestamps(mut row: Row) -> Row {
        row.push(AttributeItem::new("created_at", CREATED_AT));
        row.push(AttributeItem::new("updated_at", UPDATED_AT));
        row
    }

    fn torrent(id: u64, size: u64, progress: u64, added_on: &str, hash: &str, note: Option<&str>) -> Row {
        timestamps(vec![
            AttributeItem::new("id", id),
            AttributeItem::new("name", format!("test{}", id)),
            AttributeItem::new("size", size),
            AttributeItem::new("progress", progress),
            AttributeItem::new("added_on", added_on),
            AttributeItem::new("hash", hash),
            AttributeItem::new("note", Value::from(note)),
        ])
    }

    /// Torrents 1 to 7; torrent 6 has no files and no peers
    pub fn torrents() -> Vec<Row> {
        vec![
            torrent(1, 11, 100, "2020-08-01 20:11:10", "1579e3af2768cdf52ec84c1f320333f68401dc6e", None),
            torrent(2, 12, 200, "2020-08-02 20:11:10", "2579e3af2768cdf52ec84c1f320333f68401dc6e", None),
            torrent(3, 13, 300, "2020-08-03 20:11:10", "3579e3af2768cdf52ec84c1f320333f68401dc6e", None),
            torrent(4, 14, 400, "2020-08-04 20:11:10", "4579e3af2768cdf52ec84c1f320333f68401dc6e", Some("after update")),
            torrent(5, 15, 500, "2020-08-05 20:11:10", "5579e3af2768cdf52ec84c1f320333f68401dc6e", None),
            torrent(6, 16, 600, "2020-08-06 20:11:10", "6579e3af2768cdf52ec84c1f320333f68401dc6e", Some("no files no peers")),
            torrent(7, 17, 700, "2020-08-07 20:11:10", "7579e3af2768cdf52ec84c1f320333f68401dc6e", Some("two files")),
        ]
    }

    fn file(id: u64, torrent_id: u64, file_index: u64, size: u64) -> Row {
        timestamps(vec![
            AttributeItem::new("id", id),
            AttributeItem::new("torrent_id", torrent_id),
            AttributeItem::new("file_index", file_index),
            AttributeItem::new(
                "filepath",
                format!("test{}_file{}.mkv", torrent_id, file_index + 1),
            ),
            AttributeItem::new("size", size),
            AttributeItem::new("progress", 0u64),
            AttributeItem::new("note", Value::Null),
        ])
    }

    pub fn torrent_previewable_files() -> Vec<Row> {
        vec![
            file(1, 1, 0, 1024),
            file(2, 2, 0, 2048),
            file(3, 2, 1, 3072),
            file(4, 3, 0, 5568),
            file(5, 4, 0, 4096),
            file(6, 5, 0, 6144),
            file(7, 5, 1, 7168),
            file(8, 5, 2, 8192),
            file(9, 7, 0, 9216),
            file(10, 7, 1, 10240),
        ]
    }

    /// One property row per file of torrents 1 to 5
    pub fn torrent_previewable_file_properties() -> Vec<Row> {
        (1..=8u64)
            .map(|id| {
                timestamps(vec![
                    AttributeItem::new("id", id),
                    AttributeItem::new("previewable_file_id", id),
                    AttributeItem::new("name", format!("properties{}", id)),
                    AttributeItem::new("size", id),
                ])
            })
            .collect()
    }

    /// One peer row for each of torrents 1 to 4
    pub fn torrent_peers() -> Vec<Row> {
        (1..=4u64)
            .map(|id| {
                timestamps(vec![
                    AttributeItem::new("id", id),
                    AttributeItem::new("torrent_id", id),
                    AttributeItem::new("seeds", id),
                    AttributeItem::new("total_seeds", id),
                    AttributeItem::new("leechers", id),
                    AttributeItem::new("total_leechers", id),
                ])
            })
            .collect()
    }

    pub fn torrent_tags() -> Vec<Row> {
        (1..=4u64)
            .map(|id| {
                timestamps(vec![
                    AttributeItem::new("id", id),
                    AttributeItem::new("name", format!("tag{}", id)),
                ])
            })
            .collect()
    }

    fn tagged(torrent_id: u64, tag_id: u64, active: bool) -> Row {
        timestamps(vec![
            AttributeItem::new("torrent_id", torrent_id),
            AttributeItem::new("tag_id", tag_id),
            AttributeItem::new("active", active),
        ])
    }

    fn user(id: u64, name: &str, is_banned: bool, deleted_at: Option<&str>) -> Row {
        vec![
            AttributeItem::new("id", id),
            AttributeItem::new("name", name),
            AttributeItem::new("is_banned", is_banned),
            AttributeItem::new("note", Value::Null),
            AttributeItem::new("created_at", format!("2022-01-0{} 14:51:23", id)),
            AttributeItem::new("updated_at", format!("2022-01-0{} 17:46:31", id)),
            AttributeItem::new("deleted_at", Value::from(deleted_at)),
        ]
    }

    /// Users 1 to 5, jack and obiwan are soft deleted
    pub fn users() -> Vec<Row> {
        vec![
            user(1, "andrej", false, None),
            user(2, "silver", false, None),
            user(3, "peter", true, None),
            user(4, "jack", false, Some("2022-01-04 20:46:31")),
            user(5, "obiwan", true, Some("2022-01-05 20:46:31")),
        ]
    }

    /// One phone for each of users 1 to 4, obiwan has none
    pub fn user_phones() -> Vec<Row> {
        ["914111000", "902555777", "905111999", "903444888"]
            .into_iter()
            .zip(1u64..)
            .map(|(number, id)| {
                timestamps(vec![
                    AttributeItem::new("id", id),
                    AttributeItem::new("user_id", id),
                    AttributeItem::new("number", number),
                ])
            })
            .collect()
    }

    /// Torrent 2 has tags 1 to 3, torrent 3 has tags 2 and 4
    pub fn tag_torrent() -> Vec<Row> {
        vec![
            tagged(2, 1, true),
            tagged(2, 2, false),
            tagged(2, 3, true),
            tagged(3, 2, true),
            tagged(3, 4, true),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_database_has_clean_log() {
        let database = TestDatabase::seeded();
        assert_eq!(database.query_count(), 0);
        assert_eq!(database.rows("torrents").len(), 7);
    }

    #[test]
    fn test_record_helpers() {
        let database = TestDatabase::seeded();
        assert!(database.record_exists("torrents", &[("name", Value::from("test4"))]));
        assert_eq!(
            database.count_records("torrent_previewable_files", &[("torrent_id", Value::from(5u64))]),
            3
        );
        assert_eq!(
            database.column("torrents", 6, "note"),
            Some(Value::from("no files no peers"))
        );
    }

    #[test]
    fn test_cleanup_empties_tables() {
        let database = TestDatabase::seeded();
        database.cleanup();
        assert!(database.rows("torrents").is_empty());
    }
}
