//! Relationship existence queries through has(), where_has() and friends

use tinyorm::{ModelError, TinyBuilder, Value};
use tinyorm_testing::prelude::*;

fn ids<M: Model>(builder: TinyBuilder<M>) -> Vec<u64> {
    builder
        .order_by("id")
        .get()
        .unwrap()
        .iter()
        .filter_map(|model| model.get_key().and_then(Value::as_u64))
        .collect()
}

#[test]
fn test_has_at_least_one() {
    let database = TestDatabase::seeded();
    let torrents = database.query::<Torrent>().has("torrentFiles", ">=", 1).unwrap();
    assert_eq!(ids(torrents), vec![1, 2, 3, 4, 5, 7]);
}

#[test]
fn test_has_with_counts() {
    let database = TestDatabase::seeded();

    let two_or_more = database.query::<Torrent>().has("torrentFiles", ">=", 2).unwrap();
    assert_eq!(ids(two_or_more), vec![2, 5, 7]);

    let exactly_three = database.query::<Torrent>().has("torrentFiles", "=", 3).unwrap();
    assert_eq!(ids(exactly_three), vec![5]);

    // zero satisfies "< 2", so torrents without files are kept
    let fewer_than_two = database.query::<Torrent>().has("torrentFiles", "<", 2).unwrap();
    assert_eq!(ids(fewer_than_two), vec![1, 3, 4, 6]);
}

#[test]
fn test_doesnt_have() {
    let database = TestDatabase::seeded();

    let torrents = database.query::<Torrent>().doesnt_have("torrentFiles").unwrap();
    assert_eq!(ids(torrents), vec![6]);

    let without_peers = database.query::<Torrent>().doesnt_have("torrentPeer").unwrap();
    assert_eq!(ids(without_peers), vec![5, 6, 7]);
}

#[test]
fn test_where_has_constrains_the_related_rows() {
    let database = TestDatabase::seeded();

    let torrents = database
        .query::<Torrent>()
        .where_has::<TorrentPreviewableFile, _>("torrentFiles", |q| q.where_gt("size", 5000))
        .unwrap();
    assert_eq!(ids(torrents), vec![3, 5, 7]);

    let without_large = database
        .query::<Torrent>()
        .where_doesnt_have::<TorrentPreviewableFile, _>("torrentFiles", |q| q.where_gt("size", 5000))
        .unwrap();
    assert_eq!(ids(without_large), vec![1, 2, 4, 6]);
}

#[test]
fn test_where_has_count() {
    let database = TestDatabase::seeded();

    let torrents = database
        .query::<Torrent>()
        .where_has_count::<TorrentPreviewableFile, _>("torrentFiles", |q| q.where_gt("size", 5000), ">=", 2)
        .unwrap();
    assert_eq!(ids(torrents), vec![5, 7]);
}

#[test]
fn test_or_has_joins_with_or() {
    let database = TestDatabase::seeded();

    let torrents = database
        .query::<Torrent>()
        .where_eq("id", 6)
        .or_has("torrentPeer", ">=", 1)
        .unwrap();
    assert_eq!(ids(torrents), vec![1, 2, 3, 4, 6]);

    let torrents = database
        .query::<Torrent>()
        .where_eq("id", 1)
        .or_doesnt_have("torrentFiles")
        .unwrap();
    assert_eq!(ids(torrents), vec![1, 6]);
}

#[test]
fn test_nested_has() {
    let database = TestDatabase::seeded();

    let torrents = database
        .query::<Torrent>()
        .has("torrentFiles.fileProperty", ">=", 1)
        .unwrap();
    assert_eq!(ids(torrents), vec![1, 2, 3, 4, 5]);

    let torrents = database
        .query::<Torrent>()
        .where_has::<TorrentPreviewableFileProperty, _>("torrentFiles.fileProperty", |q| {
            q.where_gte("size", 7)
        })
        .unwrap();
    assert_eq!(ids(torrents), vec![5]);
}

#[test]
fn test_has_through_belongs_to() {
    let database = TestDatabase::seeded();

    let files = database
        .query::<TorrentPreviewableFile>()
        .where_has::<Torrent, _>("torrent", |q| q.where_eq("name", "test5"))
        .unwrap();
    assert_eq!(ids(files), vec![6, 7, 8]);
}

#[test]
fn test_has_through_belongs_to_many() {
    let database = TestDatabase::seeded();

    let tagged = database.query::<Torrent>().has("tags", ">=", 1).unwrap();
    assert_eq!(ids(tagged), vec![2, 3]);

    let many_tags = database.query::<Torrent>().has("tags", ">", 2).unwrap();
    assert_eq!(ids(many_tags), vec![2]);

    let tag4 = database
        .query::<Torrent>()
        .where_has::<Tag, _>("tags", |q| q.where_eq("torrent_tags.name", "tag4"))
        .unwrap();
    assert_eq!(ids(tag4), vec![3]);
}

#[test]
fn test_related_soft_deletes_are_excluded() {
    let database = TestDatabase::seeded();

    let phones = database.query::<Phone>().has("user", ">=", 1).unwrap();
    assert_eq!(ids(phones), vec![1, 2, 3]);

    let lonely = database.query::<User>().with_trashed().doesnt_have("phone").unwrap();
    assert_eq!(ids(lonely), vec![5]);
    assert!(ids(database.query::<User>().doesnt_have("phone").unwrap()).is_empty());
}

#[test]
fn test_has_runs_one_select() {
    let database = TestDatabase::seeded();
    database
        .query::<Torrent>()
        .has("torrentFiles.fileProperty", ">=", 1)
        .unwrap()
        .get()
        .unwrap();

    let log = database.query_log();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].sql,
        "SELECT torrents.* FROM torrents WHERE torrents.id IN (SELECT torrent_previewable_files.torrent_id \
         FROM torrent_previewable_files WHERE torrent_previewable_files.id IN \
         (SELECT torrent_previewable_file_properties.previewable_file_id \
         FROM torrent_previewable_file_properties \
         WHERE torrent_previewable_file_properties.previewable_file_id IS NOT NULL) \
         AND torrent_previewable_files.torrent_id IS NOT NULL)"
    );
}

#[test]
fn test_constraint_of_wrong_model_is_rejected() {
    let database = TestDatabase::seeded();
    let result = database
        .query::<Torrent>()
        .where_has::<Tag, _>("torrentFiles", |q| q);
    assert!(matches!(result, Err(ModelError::RelationMapping { .. })));
}
