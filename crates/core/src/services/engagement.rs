//! Engagement service: like and repost toggles.
//!
//! Both toggles are read-then-write set mutations on the target entity with
//! no locking; racing duplicates resolve through set semantics (adding an
//! existing id is a no-op, removing a missing one too).

use crate::services::notification::NotificationService;
use crate::services::post::{decode_ids, decode_media};
use chrono::Utc;
use sea_orm::Set;
use serde_json::json;
use shoal_common::{AppResult, IdGenerator};
use shoal_db::{
    entities::post::{self, PostKind},
    repositories::{PostRepository, UserRepository},
};

/// Engagement service for business logic.
#[derive(Clone)]
pub struct EngagementService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl EngagementService {
    /// Create a new engagement service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Toggle a like on an entity.
    ///
    /// Liking notifies the author (`comment_like` when the target is a
    /// comment); unliking retracts that notification. Returns the updated
    /// entity so the response reflects the mutation just applied.
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> AppResult<post::Model> {
        let entity = self.post_repo.get_by_id(post_id).await?;

        let mut likers = decode_ids(&entity.liker_ids);
        let already_liked = likers.iter().any(|id| id == user_id);

        if already_liked {
            likers.retain(|id| id != user_id);
        } else {
            likers.push(user_id.to_string());
        }

        let author_id = entity.author_id.clone();
        let is_comment = entity.kind == PostKind::Comment;

        let mut active: post::ActiveModel = entity.into();
        active.liker_ids = Set(json!(likers));
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.post_repo.update(active).await?;

        if already_liked {
            if let Err(e) = self
                .notifications
                .retract_like(&author_id, user_id, post_id)
                .await
            {
                tracing::warn!(error = %e, post_id = %post_id, "Failed to retract like notification");
            }
        } else if let Err(e) = self
            .notifications
            .notify_like(&author_id, user_id, post_id, is_comment)
            .await
        {
            tracing::warn!(error = %e, post_id = %post_id, "Failed to create like notification");
        }

        tracing::debug!(
            post_id = %post_id,
            user_id = %user_id,
            liked = !already_liked,
            "Toggled like"
        );
        Ok(updated)
    }

    /// Toggle a repost of an entity.
    ///
    /// Reposting creates a `repost`-kind entity copying the original's
    /// content and media; unreposting deletes it. No notification is sent to
    /// the original author either way. Returns the updated original.
    pub async fn toggle_repost(&self, user_id: &str, post_id: &str) -> AppResult<post::Model> {
        let original = self.post_repo.get_by_id(post_id).await?;

        let mut reposters = decode_ids(&original.reposter_ids);
        let already_reposted = reposters.iter().any(|id| id == user_id);

        if already_reposted {
            reposters.retain(|id| id != user_id);
        } else {
            reposters.push(user_id.to_string());
        }

        let original_content = original.content.clone();
        let original_media = decode_media(&original.media);

        let mut active: post::ActiveModel = original.into();
        active.reposter_ids = Set(json!(reposters));
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.post_repo.update(active).await?;

        if already_reposted {
            // Remove the repost entity this user created for the original
            if let Some(repost) = self.post_repo.find_repost(user_id, post_id).await? {
                self.post_repo.delete(&repost.id).await?;
                let _ = self.user_repo.decrement_posts_count(user_id).await;
            }
        } else {
            let model = post::ActiveModel {
                id: Set(self.id_gen.generate()),
                author_id: Set(user_id.to_string()),
                kind: Set(PostKind::Repost),
                content: Set(original_content),
                depth: Set(0),
                parent_id: Set(None),
                root_id: Set(None),
                original_post_id: Set(Some(post_id.to_string())),
                child_ids: Set(json!([])),
                liker_ids: Set(json!([])),
                reposter_ids: Set(json!([])),
                media: Set(json!(original_media)),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            };

            self.post_repo.create(model).await?;
            let _ = self.user_repo.increment_posts_count(user_id).await;
        }

        tracing::debug!(
            post_id = %post_id,
            user_id = %user_id,
            reposted = !already_reposted,
            "Toggled repost"
        );
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::NotificationService;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use shoal_db::repositories::NotificationRepository;
    use std::sync::Arc;

    fn make_post(id: &str, author_id: &str, likers: serde_json::Value) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            kind: PostKind::Post,
            content: Some("Test".to_string()),
            depth: 0,
            parent_id: None,
            root_id: None,
            original_post_id: None,
            child_ids: json!([]),
            liker_ids: likers,
            reposter_ids: json!([]),
            media: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(post_db: Arc<sea_orm::DatabaseConnection>) -> EngagementService {
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let notification_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let notif_user_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        EngagementService::new(
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            NotificationService::new(
                NotificationRepository::new(notification_db),
                UserRepository::new(notif_user_db),
            ),
        )
    }

    #[tokio::test]
    async fn test_toggle_like_missing_post_returns_not_found() {
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let result = service(post_db).toggle_like("user1", "ghost").await;
        assert!(matches!(
            result,
            Err(shoal_common::AppError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_repost_missing_post_returns_not_found() {
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let result = service(post_db).toggle_repost("user1", "ghost").await;
        assert!(matches!(
            result,
            Err(shoal_common::AppError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_like_adds_user_to_set() {
        let before = make_post("post1", "author1", json!([]));
        let after = make_post("post1", "author1", json!(["user1"]));

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![before]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([vec![after]])
                .into_connection(),
        );

        let updated = service(post_db).toggle_like("user1", "post1").await.unwrap();
        let likers = decode_ids(&updated.liker_ids);
        assert_eq!(likers, vec!["user1"]);
    }

    #[tokio::test]
    async fn test_toggle_like_removes_existing_like() {
        let before = make_post("post1", "author1", json!(["user1", "user2"]));
        let after = make_post("post1", "author1", json!(["user2"]));

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![before]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([vec![after]])
                .into_connection(),
        );

        let updated = service(post_db).toggle_like("user1", "post1").await.unwrap();
        let likers = decode_ids(&updated.liker_ids);
        assert_eq!(likers, vec!["user2"]);
    }
}
