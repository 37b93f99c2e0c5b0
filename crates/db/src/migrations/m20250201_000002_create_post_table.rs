//! Create post table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Post::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Post::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Post::Kind).string_len(16).not_null().default("post"))
                    .col(ColumnDef::new(Post::Content).text())
                    .col(ColumnDef::new(Post::Depth).integer().not_null().default(0))
                    .col(ColumnDef::new(Post::ParentId).string_len(32))
                    .col(ColumnDef::new(Post::RootId).string_len(32))
                    .col(ColumnDef::new(Post::OriginalPostId).string_len(32))
                    .col(ColumnDef::new(Post::ChildIds).json_binary().not_null().default("[]"))
                    .col(ColumnDef::new(Post::LikerIds).json_binary().not_null().default("[]"))
                    .col(ColumnDef::new(Post::ReposterIds).json_binary().not_null().default("[]"))
                    .col(ColumnDef::new(Post::Media).json_binary().not_null().default("[]"))
                    .col(
                        ColumnDef::new(Post::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Post::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Composite index: (author_id, id) for user timeline
        manager
            .create_index(
                Index::create()
                    .name("idx_post_author_id_id")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .col(Post::Id)
                    .to_owned(),
            )
            .await?;

        // Index: parent_id
        manager
            .create_index(
                Index::create()
                    .name("idx_post_parent_id")
                    .table(Post::Table)
                    .col(Post::ParentId)
                    .to_owned(),
            )
            .await?;

        // Index: root_id
        manager
            .create_index(
                Index::create()
                    .name("idx_post_root_id")
                    .table(Post::Table)
                    .col(Post::RootId)
                    .to_owned(),
            )
            .await?;

        // Index: original_post_id
        manager
            .create_index(
                Index::create()
                    .name("idx_post_original_post_id")
                    .table(Post::Table)
                    .col(Post::OriginalPostId)
                    .to_owned(),
            )
            .await?;

        // Index: kind + created_at (for feed queries)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_kind_created_at")
                    .table(Post::Table)
                    .col(Post::Kind)
                    .col(Post::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Foreign key: author_id -> user.id
        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_post_author_id")
                    .from(Post::Table, Post::AuthorId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
    AuthorId,
    Kind,
    Content,
    Depth,
    ParentId,
    RootId,
    OriginalPostId,
    ChildIds,
    LikerIds,
    ReposterIds,
    Media,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
