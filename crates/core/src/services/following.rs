//! Following service.

use crate::services::notification::NotificationService;
use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;
use shoal_common::{AppError, AppResult, IdGenerator};
use shoal_db::{
    entities::following,
    repositories::{FollowingRepository, UserRepository},
};

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

/// Follow state after a toggle, with counts recomputed from the relation
/// rows so they always match the persisted sets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStats {
    /// Whether the acting user now follows the target.
    pub following: bool,
    /// The target's follower count.
    pub followers_count: u64,
    /// The acting user's following count.
    pub following_count: u64,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        following_repo: FollowingRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            following_repo,
            user_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Toggle the follow relationship towards a target username.
    ///
    /// Both sides mutate together: the relation row and the two denormalized
    /// counters move in the same request. Following notifies the target;
    /// unfollowing is silent.
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_username: &str,
    ) -> AppResult<FollowStats> {
        let followee = self.user_repo.get_by_username(followee_username).await?;

        if followee.id == follower_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        let currently_following = self
            .following_repo
            .is_following(follower_id, &followee.id)
            .await?;

        if currently_following {
            self.following_repo
                .delete_by_pair(follower_id, &followee.id)
                .await?;
            self.user_repo
                .decrement_following_count(follower_id)
                .await?;
            self.user_repo
                .decrement_followers_count(&followee.id)
                .await?;
        } else {
            let model = following::ActiveModel {
                id: Set(self.id_gen.generate()),
                follower_id: Set(follower_id.to_string()),
                followee_id: Set(followee.id.clone()),
                created_at: Set(Utc::now().into()),
            };
            self.following_repo.create(model).await?;
            self.user_repo
                .increment_following_count(follower_id)
                .await?;
            self.user_repo
                .increment_followers_count(&followee.id)
                .await?;

            if let Err(e) = self.notifications.notify_follow(&followee.id, follower_id).await {
                tracing::warn!(error = %e, followee = %followee.id, "Failed to create follow notification");
            }
        }

        let followers_count = self.following_repo.count_followers(&followee.id).await?;
        let following_count = self.following_repo.count_following(follower_id).await?;

        tracing::debug!(
            follower_id = %follower_id,
            followee_id = %followee.id,
            following = !currently_following,
            "Toggled follow"
        );

        Ok(FollowStats {
            following: !currently_following,
            followers_count,
            following_count,
        })
    }

    /// IDs of the users `user_id` follows.
    pub async fn following_ids(&self, user_id: &str, limit: u64) -> AppResult<Vec<String>> {
        let rows = self.following_repo.find_following(user_id, limit, None).await?;
        Ok(rows.into_iter().map(|f| f.followee_id).collect())
    }

    /// Check whether one user follows another.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.following_repo
            .is_following(follower_id, followee_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use shoal_db::entities::user;
    use shoal_db::repositories::NotificationRepository;
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$test".to_string(),
            token: None,
            name: None,
            avatar_url: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(
        user_db: Arc<sea_orm::DatabaseConnection>,
        following_db: Arc<sea_orm::DatabaseConnection>,
    ) -> FollowingService {
        let notification_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let notif_user_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        FollowingService::new(
            FollowingRepository::new(following_db),
            UserRepository::new(user_db),
            NotificationService::new(
                NotificationRepository::new(notification_db),
                UserRepository::new(notif_user_db),
            ),
        )
    }

    #[tokio::test]
    async fn test_toggle_follow_unknown_user_returns_not_found() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let following_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(user_db, following_db)
            .toggle_follow("user1", "ghost")
            .await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_follow_self_returns_bad_request() {
        let me = create_test_user("user1", "alice");
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[me]])
                .into_connection(),
        );
        let following_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(user_db, following_db)
            .toggle_follow("user1", "alice")
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_following_ids() {
        let f1 = following::Model {
            id: "f1".to_string(),
            follower_id: "user1".to_string(),
            followee_id: "user2".to_string(),
            created_at: Utc::now().into(),
        };
        let f2 = following::Model {
            id: "f2".to_string(),
            follower_id: "user1".to_string(),
            followee_id: "user3".to_string(),
            created_at: Utc::now().into(),
        };

        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let following_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .into_connection(),
        );

        let ids = service(user_db, following_db)
            .following_ids("user1", 1000)
            .await
            .unwrap();

        assert_eq!(ids, vec!["user2", "user3"]);
    }
}
