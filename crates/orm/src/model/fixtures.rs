//! Small models for unit tests inside the crate

use crate::model::{BaseModel, HasRelations, Model};
use crate::relationships::RelationRegistry;

#[derive(Debug, Clone, Default)]
pub struct Post {
    base: BaseModel,
}

impl Model for Post {
    fn table_name() -> &'static str {
        "posts"
    }

    fn dates() -> &'static [&'static str] {
        &["published_at"]
    }

    fn fillable() -> &'static [&'static str] {
        &["title", "body", "published_at"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<Comment>("comments", |post| Box::new(post.has_many::<Comment>(None, None)));
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default)]
pub struct Comment {
    base: BaseModel,
}

impl Model for Comment {
    fn table_name() -> &'static str {
        "comments"
    }

    fn touches() -> &'static [&'static str] {
        &["post"]
    }

    fn register_relations(relations: &mut RelationRegistry<Self>) {
        relations.relation::<Post>("post", |comment| Box::new(comment.belongs_to::<Post>("post", None, None)));
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

/// A model without a primary key
#[derive(Debug, Clone, Default)]
pub struct Keyless {
    base: BaseModel,
}

impl Model for Keyless {
    fn table_name() -> &'static str {
        "keyless"
    }

    fn primary_key_name() -> &'static str {
        ""
    }

    fn incrementing() -> bool {
        false
    }

    fn uses_timestamps() -> bool {
        false
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

/// A totally guarded model
#[derive(Debug, Clone, Default)]
pub struct Locked {
    base: BaseModel,
}

impl Model for Locked {
    fn table_name() -> &'static str {
        "locked"
    }

    fn guarded() -> &'static [&'static str] {
        &["*"]
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}

/// A soft deleting model
#[derive(Debug, Clone, Default)]
pub struct Archived {
    base: BaseModel,
}

impl Model for Archived {
    fn table_name() -> &'static str {
        "archived"
    }

    fn soft_deletes() -> bool {
        true
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }
}
