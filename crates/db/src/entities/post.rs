//! Post entity.
//!
//! A single polymorphic record backs top-level posts, nested comments, and
//! reposts, discriminated by [`PostKind`]. Comments carry parent/root
//! back-references; reposts carry the original post reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Content entity kinds.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[sea_orm(string_value = "post")]
    Post,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "repost")]
    Repost,
}

/// Media attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// A media attachment embedded in a post's `media` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub media_type: MediaType,
    pub url: String,
    pub storage_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Entity kind discriminant
    pub kind: PostKind,

    /// Text body (required unless media is non-empty)
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    /// Nesting level: 0 for posts/reposts, 1-2 for comments
    #[sea_orm(default_value = 0)]
    pub depth: i32,

    /// Immediate parent (comments only)
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<String>,

    /// Top-level ancestor (comments only)
    #[sea_orm(nullable, indexed)]
    pub root_id: Option<String>,

    /// Reposted entity (reposts only)
    #[sea_orm(nullable, indexed)]
    pub original_post_id: Option<String>,

    /// Direct child comment IDs, insertion order = display order
    #[sea_orm(column_type = "JsonBinary")]
    pub child_ids: Json,

    /// User IDs who liked this entity (set semantics)
    #[sea_orm(column_type = "JsonBinary")]
    pub liker_ids: Json,

    /// User IDs who reposted this entity (set semantics)
    #[sea_orm(column_type = "JsonBinary")]
    pub reposter_ids: Json,

    /// Ordered media attachments, immutable after creation
    #[sea_orm(column_type = "JsonBinary")]
    pub media: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::RootId",
        to = "Column::Id"
    )]
    Root,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::OriginalPostId",
        to = "Column::Id"
    )]
    Original,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
