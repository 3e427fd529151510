//! Attribute store behavior on fixture models loaded from the test database

use tinyorm::{AttributeItem, ModelError, Value};
use tinyorm_testing::prelude::*;
use tinyorm_testing::utils;

fn torrent(database: &TestDatabase, id: u64) -> Torrent {
    database.query::<Torrent>().find(id).unwrap().unwrap()
}

#[test]
fn test_hydrated_model_is_clean() {
    let database = TestDatabase::seeded();
    let torrent = torrent(&database, 1);

    assert!(torrent.exists());
    assert!(torrent.get_dirty().is_empty());
    assert!(torrent.is_clean(&[]));
    assert_eq!(torrent.get_attribute("name"), Some(&Value::from("test1")));
    assert_eq!(torrent.get_attributes(), torrent.get_original());
}

#[test]
fn test_date_precision_difference_is_not_dirty() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 2);

    let added_on = utils::timestamp("2020-08-02 20:11:10") + chrono::Duration::milliseconds(250);
    torrent.set_attribute("added_on", added_on).unwrap();

    assert_eq!(
        torrent.get_attribute("added_on"),
        Some(&Value::from("2020-08-02 20:11:10"))
    );
    assert!(torrent.get_dirty().is_empty());
}

#[test]
fn test_changed_date_is_dirty() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 2);

    torrent
        .set_attribute("added_on", utils::timestamp("2020-08-02 20:11:11"))
        .unwrap();
    torrent.set_attribute("size", 12u64).unwrap();

    let dirty = torrent.get_dirty();
    assert_eq!(
        dirty,
        vec![AttributeItem::new("added_on", "2020-08-02 20:11:11")]
    );
    assert!(torrent.is_dirty(&["added_on"]));
    assert!(torrent.is_clean(&["size"]));
}

#[test]
fn test_sync_original_is_idempotent() {
    let database = TestDatabase::seeded();
    let mut torrent = torrent(&database, 3);

    torrent
        .fill(vec![
            AttributeItem::new("name", "renamed"),
            AttributeItem::new("note", "a note"),
            AttributeItem::new("extra", 42i64),
        ])
        .unwrap();
    assert_eq!(torrent.get_dirty().len(), 3);

    torrent.sync_original();
    assert!(torrent.get_dirty().is_empty());
    torrent.sync_original();
    assert!(torrent.get_dirty().is_empty());
}

#[test]
fn test_fill_keeps_last_value_and_first_position() {
    let mut torrent = Torrent::default();
    torrent
        .fill(vec![
            AttributeItem::new("name", "first"),
            AttributeItem::new("size", 1u64),
            AttributeItem::new("name", "second"),
            AttributeItem::new("hash", "abc"),
        ])
        .unwrap();

    let keys: Vec<&str> = torrent.get_attributes().iter().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["name", "size", "hash"]);
    assert_eq!(torrent.get_attribute("name"), Some(&Value::from("second")));
}

#[test]
fn test_malformed_date_string_fails_to_parse() {
    let torrent = Torrent::default();
    let result = torrent.as_date_time(&Value::from("01/08/2020 20:11"));

    match result {
        Err(ModelError::DateParse { value, format }) => {
            assert_eq!(value, "01/08/2020 20:11");
            assert_eq!(format, "%Y-%m-%d %H:%M:%S");
        }
        other => panic!("expected DateParse, got {:?}", other),
    }
}

#[test]
fn test_setting_malformed_date_string_fails() {
    let mut torrent = Torrent::default();
    let result = torrent.set_attribute("added_on", "yesterday");
    assert!(matches!(result, Err(ModelError::DateParse { .. })));
}

#[test]
fn test_connection_date_format_is_used() {
    let connection = std::sync::Arc::new(
        MemoryConnection::new("default").with_date_format("%d.%m.%Y %H:%M"),
    );
    let manager = tinyorm::DatabaseManager::new("default").with_connection(connection);

    let mut torrent = Torrent::default();
    torrent.set_resolver(std::sync::Arc::new(manager));
    torrent
        .set_attribute("added_on", utils::timestamp("2020-08-01 20:11:10"))
        .unwrap();

    assert_eq!(torrent.get_date_format(), "%d.%m.%Y %H:%M");
    assert_eq!(
        torrent.get_attribute("added_on"),
        Some(&Value::from("01.08.2020 20:11"))
    );
}

#[test]
fn test_only_and_foreign_key() {
    let database = TestDatabase::seeded();
    let torrent = torrent(&database, 4);

    let only = torrent.only(&["name", "missing"]);
    assert_eq!(only, vec![AttributeItem::new("name", "test4")]);
    assert_eq!(torrent.get_foreign_key(), "torrent_id");
    assert_eq!(torrent.get_qualified_key_name(), "torrents.id");
}

#[test]
fn test_fill_drops_attributes_outside_fillable() {
    let database = TestDatabase::seeded();
    let mut user = database.model::<User>();

    user.fill([
        AttributeItem::new("id", 9u64),
        AttributeItem::new("name", "yoda"),
        AttributeItem::new("password", "secret"),
        AttributeItem::new("users.note", "qualified"),
    ])
    .unwrap();

    assert!(user.get_attribute("id").is_none());
    assert!(user.get_attribute("password").is_none());
    assert_eq!(user.get_attribute("name"), Some(&Value::from("yoda")));
    assert_eq!(user.get_attribute("note"), Some(&Value::from("qualified")));
}

#[test]
fn test_fill_skips_guarded_key() {
    let database = TestDatabase::seeded();
    let mut phone = database.model::<Phone>();

    phone
        .fill([AttributeItem::new("ID", 7u64), AttributeItem::new("number", "900100200")])
        .unwrap();
    assert!(phone.get_attribute("ID").is_none());
    assert_eq!(phone.get_attribute("number"), Some(&Value::from("900100200")));

    phone.force_fill([AttributeItem::new("id", 7u64)]).unwrap();
    assert_eq!(phone.get_key(), Some(&Value::from(7u64)));
}

#[test]
fn test_create_goes_through_the_guards() {
    let database = TestDatabase::seeded();

    let user = database
        .query::<User>()
        .create([
            AttributeItem::new("id", 42u64),
            AttributeItem::new("name", "leia"),
            AttributeItem::new("is_banned", false),
        ])
        .unwrap();

    assert!(user.exists());
    assert_ne!(user.get_key().and_then(Value::as_u64), Some(42));
    assert!(!database.record_exists("users", &[("id", Value::from(42u64))]));
    assert!(database.record_exists("users", &[("name", Value::from("leia"))]));
}
