//! Saving, updating and removing models

use tinyorm::{AttributeItem, BaseModel, CrudOperations, ModelError, Value};
use tinyorm_testing::prelude::*;

fn torrent(database: &TestDatabase, id: u64) -> Torrent {
    database.query::<Torrent>().find(id).unwrap().unwrap()
}

/// A pivot-like model without a primary key
#[derive(Debug, Clone, Default)]
struct TagTorrent {
    base: BaseModel,
}

impl Model for TagTorrent {
    fn table_name() -> &'static str {
        "tag_torrent"
    }

    fn primary_key_name() -> &'static str {
        ""
    }

    fn incrementing() -> bool {
        false
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[test]
fn test_find_update_and_requery() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 4);
    let updated_at = torrent.get_attribute("updated_at").cloned();

    let updated = torrent
        .update(vec![AttributeItem::new("name", "newname")])
        .unwrap();

    assert!(updated);
    assert!(torrent.get_dirty().is_empty());

    let fresh = database.query::<Torrent>().find(4u64).unwrap().unwrap();
    assert_eq!(fresh.get_attribute("name"), Some(&Value::from("newname")));
    assert_ne!(fresh.get_attribute("updated_at").cloned(), updated_at);
    assert_eq!(fresh.get_attribute("hash"), torrent.get_attribute("hash"));
}

#[test]
fn test_update_of_missing_model_is_false() {
    let database = TestDatabase::seeded();
    let mut torrent = database.model::<Torrent>();

    assert!(!torrent.update(vec![AttributeItem::new("name", "x")]).unwrap());
    assert_eq!(database.query_count(), 0);
}

#[test]
fn test_insert_sets_generated_key() {
    let database = TestDatabase::seeded();
    let mut torrent = database.model::<Torrent>();
    torrent
        .fill(vec![
            AttributeItem::new("name", "test8"),
            AttributeItem::new("size", 18u64),
        ])
        .unwrap();

    assert!(torrent.save().unwrap());
    assert!(torrent.exists());
    assert_eq!(torrent.get_key().and_then(Value::as_u64), Some(8));
    assert!(torrent.get_attribute("created_at").is_some());
    assert!(torrent.get_dirty().is_empty());
    assert!(database.record_exists("torrents", &[("name", Value::from("test8"))]));
}

#[test]
fn test_insert_returning_zero_id_fails() {
    let database = TestDatabase::seeded();
    database.fail_on("torrents", InjectedFailure::ZeroId);

    let mut torrent = database.model::<Torrent>();
    torrent.set_attribute("name", "lost").unwrap();

    assert!(!torrent.save().unwrap());
    assert!(!torrent.exists());
    assert!(torrent.get_key().is_none());
}

#[test]
fn test_failed_insert_statement_is_false() {
    let database = TestDatabase::seeded();
    database.fail_on("torrents", InjectedFailure::Statement);

    let mut torrent = database.model::<Torrent>();
    torrent.set_attribute("name", "lost").unwrap();

    assert!(!torrent.save().unwrap());
    assert!(!torrent.exists());
}

#[test]
fn test_saving_clean_model_issues_no_update() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 1);
    database.reset_query_log();

    assert!(torrent.save().unwrap());
    assert_eq!(database.count_of(StatementKind::Update), 0);
    assert_eq!(database.query_count(), 0);
}

#[test]
fn test_failed_update_keeps_dirty_state() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 2);
    database.fail_on("torrents", InjectedFailure::Statement);

    torrent.set_attribute("name", "unsaved").unwrap();
    assert!(!torrent.save().unwrap());
    assert!(torrent.is_dirty(&["name"]));
    assert_eq!(database.column("torrents", 2, "name"), Some(Value::from("test2")));
}

#[test]
fn test_update_keys_on_original_primary_key() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 3);

    torrent.set_attribute("name", "renumbered").unwrap();
    torrent.set_attribute("id", 30u64).unwrap();
    assert!(torrent.save().unwrap());

    assert_eq!(database.column("torrents", 30, "name"), Some(Value::from("renumbered")));
    assert_eq!(database.column("torrents", 3, "name"), None);
}

#[test]
fn test_was_changed_after_save() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 5);

    torrent.set_attribute("note", "changed").unwrap();
    torrent.save().unwrap();

    assert!(torrent.was_changed(&["note"]));
    assert!(!torrent.was_changed(&["name"]));
}

#[test]
fn test_remove() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 6);

    assert!(torrent.remove().unwrap());
    assert!(!torrent.exists());
    assert!(!database.record_exists("torrents", &[("id", Value::from(6u64))]));

    // A removed model no longer has a row to delete
    assert!(!torrent.remove().unwrap());
}

#[test]
fn test_remove_without_key_name_fails() {
    let database = TestDatabase::seeded();
    let mut pivot = database.model::<TagTorrent>();
    pivot.set_exists(true);

    let result = pivot.remove();
    assert!(matches!(result, Err(ModelError::MissingKeyName(name)) if name == "TagTorrent"));
    assert_eq!(database.count_of(StatementKind::Delete), 0);
}

#[test]
fn test_non_incrementing_insert() {
    let database = TestDatabase::seeded();
    let mut pivot = database.model::<TagTorrent>();
    pivot
        .fill(vec![
            AttributeItem::new("torrent_id", 1u64),
            AttributeItem::new("tag_id", 4u64),
        ])
        .unwrap();

    assert!(pivot.save().unwrap());
    assert!(pivot.exists());
    assert!(database.record_exists(
        "tag_torrent",
        &[("torrent_id", Value::from(1u64)), ("tag_id", Value::from(4u64))]
    ));
}

#[test]
fn test_touch_bumps_updated_at() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 1);
    let before = torrent.get_attribute("updated_at").cloned();

    assert!(torrent.touch().unwrap());
    assert_eq!(database.count_of(StatementKind::Update), 1);
    assert_ne!(database.column("torrents", 1, "updated_at"), before);
}

#[test]
fn test_builder_create() {
    let database = TestDatabase::seeded();
    let torrent = database
        .query::<Torrent>()
        .create(vec![
            AttributeItem::new("name", "created"),
            AttributeItem::new("hash", tinyorm_testing::utils::random_hash()),
        ])
        .unwrap();

    assert!(torrent.exists());
    assert_eq!(database.rows("torrents").len(), 8);
}

#[test]
fn test_fresh_and_refresh() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 2);

    let mut other = torrent.clone();
    other.set_attribute("name", "elsewhere").unwrap();
    other.save().unwrap();

    let fresh = torrent.fresh(&[]).unwrap().unwrap();
    assert_eq!(fresh.get_attribute("name"), Some(&Value::from("elsewhere")));
    assert_eq!(torrent.get_attribute("name"), Some(&Value::from("test2")));

    torrent.refresh().unwrap();
    assert_eq!(torrent.get_attribute("name"), Some(&Value::from("elsewhere")));
    assert!(torrent.get_dirty().is_empty());
}

#[test]
fn test_replicate_and_identity() {
    let database = TestDatabase::seeded();
    let torrent = torrent(&database, 3);
    let again = database.query::<Torrent>().find(3u64).unwrap().unwrap();

    assert!(torrent.is(&again));
    assert!(torrent.is_not(&database.query::<Torrent>().find(4u64).unwrap().unwrap()));

    let copy = torrent.replicate(&["hash"]);
    assert!(!copy.exists());
    assert!(copy.get_key().is_none());
    assert!(copy.get_attribute("hash").is_none());
    assert!(copy.get_attribute("created_at").is_none());
    assert_eq!(copy.get_attribute("name"), Some(&Value::from("test3")));
}

#[test]
fn test_first_or_create() {
    let database = TestDatabase::seeded();
    let builder = database.query::<Torrent>();

    let existing = builder
        .first_or_create(&[AttributeItem::new("name", "test5")], &[])
        .unwrap();
    assert_eq!(existing.get_key().and_then(Value::as_u64), Some(5));

    let created = builder
        .first_or_create(
            &[AttributeItem::new("name", "test9")],
            &[AttributeItem::new("size", 19u64)],
        )
        .unwrap();
    assert!(created.exists());
    assert_eq!(created.get_attribute("size"), Some(&Value::from(19u64)));
    assert_eq!(database.rows("torrents").len(), 8);
}

#[test]
fn test_insert_binds_dates_typed_and_inlines_null() {
    let database = TestDatabase::seeded();
    let mut torrent = database.model::<Torrent>();
    torrent
        .fill(vec![
            AttributeItem::new("name", "test8"),
            AttributeItem::new("note", Value::Null),
            AttributeItem::new("added_on", "2021-01-01 14:51:23"),
        ])
        .unwrap();
    database.reset_query_log();

    assert!(torrent.save().unwrap());

    let insert = &database.query_log()[0];
    assert_eq!(insert.kind, StatementKind::Insert);
    assert!(insert.sql.contains("VALUES ($1, NULL, $2, $3, $4) RETURNING id"));
    assert!(!insert.bindings.iter().any(Value::is_null));
    assert_eq!(insert.bindings[1], Value::DateTime(utils::timestamp("2021-01-01 14:51:23")));
    assert!(matches!(insert.bindings[2], Value::DateTime(_)));
    assert!(matches!(insert.bindings[3], Value::DateTime(_)));

    let stored = database.column("torrents", 8, "added_on");
    assert_eq!(stored, Some(Value::from("2021-01-01 14:51:23")));
}

#[test]
fn test_update_binds_dates_typed() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 1);
    database.reset_query_log();

    torrent.set_attribute("added_on", "2022-02-02 02:02:02").unwrap();
    assert!(torrent.save().unwrap());

    let update = &database.query_log()[0];
    assert_eq!(update.kind, StatementKind::Update);
    assert!(update
        .bindings
        .iter()
        .all(|value| matches!(value, Value::DateTime(_) | Value::Int(_) | Value::UInt(_))));
    assert_eq!(database.column("torrents", 1, "added_on"), Some(Value::from("2022-02-02 02:02:02")));
}
