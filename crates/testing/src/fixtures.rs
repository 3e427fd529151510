//! Torrent fixture models
//!
//! A torrent has previewable files and peers, files have one property row
//! and torrents are tagged through the `tag_torrent` pivot table. Users soft
//! delete and own one phone each.

use tinyorm::{BaseModel, HasRelations, Model, RelationRegistry};

#[derive(Debug, Clone, Default)]
pub struct Torrent {
    base: BaseModel,
}

impl Model for Torrent {
    fn table_name() -> &'static str {
        "torrents"
    }

    fn dates() -> &'static [&'static str] {
        &["added_on"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations
            .relation::<TorrentPreviewableFile>("torrentFiles", |torrent| {
                Box::new(torrent.has_many::<TorrentPreviewableFile>(None, None))
            })
            .relation::<TorrentPeer>("torrentPeer", |torrent| {
                Box::new(torrent.has_one::<TorrentPeer>(None, None))
            })
            .relation::<TorrentPeer>("torrentPeers", |torrent| {
                Box::new(torrent.has_many::<TorrentPeer>(None, None))
            })
            .relation::<Tag>("tags", |torrent| {
                Box::new(
                    torrent
                        .belongs_to_many::<Tag>(None, None, None, None, None)
                        .with_pivot(&["active"])
                        .with_timestamps(),
                )
            });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct TorrentPreviewableFile {
    base: BaseModel,
}

impl Model for TorrentPreviewableFile {
    fn table_name() -> &'static str {
        "torrent_previewable_files"
    }

    fn touches() -> &'static [&'static str] {
        &["torrent"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations
            .relation::<Torrent>("torrent", |file| {
                Box::new(file.belongs_to::<Torrent>("torrent", None, None))
            })
            .relation::<TorrentPreviewableFileProperty>("fileProperty", |file| {
                Box::new(
                    file.has_one::<TorrentPreviewableFileProperty>(Some("previewable_file_id"), None),
                )
            });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct TorrentPreviewableFileProperty {
    base: BaseModel,
}

impl Model for TorrentPreviewableFileProperty {
    fn table_name() -> &'static str {
        "torrent_previewable_file_properties"
    }

    fn touches() -> &'static [&'static str] {
        &["torrentFile"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<TorrentPreviewableFile>("torrentFile", |property| {
            Box::new(property.belongs_to::<TorrentPreviewableFile>(
                "torrentFile",
                Some("previewable_file_id"),
                None,
            ))
        });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct TorrentPeer {
    base: BaseModel,
}

impl Model for TorrentPeer {
    fn table_name() -> &'static str {
        "torrent_peers"
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<Torrent>("torrent", |peer| {
            Box::new(peer.belongs_to::<Torrent>("torrent", None, None))
        });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tag {
    base: BaseModel,
}

impl Model for Tag {
    fn table_name() -> &'static str {
        "torrent_tags"
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<Torrent>("torrents", |tag| {
            Box::new(
                tag.belongs_to_many::<Torrent>(None, None, None, None, None)
                    .with_pivot(&["active"]),
            )
        });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

/// Soft deleting user, mass assignable through its fillable list
#[derive(Debug, Clone, Default)]
pub struct User {
    base: BaseModel,
}

impl Model for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn soft_deletes() -> bool {
        true
    }

    fn fillable() -> &'static [&'static str] {
        &["name", "is_banned", "note"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<Phone>("phone", |user| {
            Box::new(
                user.has_one::<Phone>(None, None)
                    .with_default_attributes([("number", "none")]),
            )
        });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct Phone {
    base: BaseModel,
}

impl Model for Phone {
    fn table_name() -> &'static str {
        "user_phones"
    }

    fn guarded() -> &'static [&'static str] {
        &["id"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<User>("user", |phone| {
            Box::new(
                phone
                    .belongs_to::<User>("user", None, None)
                    .with_default_attributes([("name", "guest")]),
            )
        });
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}
