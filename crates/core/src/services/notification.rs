//! Notification service.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::Serialize;
use shoal_common::{AppError, AppResult, IdGenerator};
use shoal_db::{
    entities::notification::{self, NotificationType},
    repositories::{NotificationRepository, UserRepository},
};

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// A notification decorated for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub sender_id: String,
    pub sender_username: Option<String>,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    /// Relative age, e.g. "42s", "5m", "3h", "2d", or a short date.
    pub age: String,
    /// Rendered human-readable line, e.g. "alice liked your post".
    pub body: String,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository, user_repo: UserRepository) -> Self {
        Self {
            notification_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a like notification (`like` for posts, `comment_like` for comments).
    pub async fn notify_like(
        &self,
        recipient_id: &str,
        sender_id: &str,
        post_id: &str,
        target_is_comment: bool,
    ) -> AppResult<Option<notification::Model>> {
        let notification_type = if target_is_comment {
            NotificationType::CommentLike
        } else {
            NotificationType::Like
        };
        self.create_internal(recipient_id, sender_id, notification_type, Some(post_id))
            .await
    }

    /// Create a comment notification. `root_post_id` is the top-level post so
    /// opening the notification always lands on the whole thread.
    pub async fn notify_comment(
        &self,
        recipient_id: &str,
        sender_id: &str,
        root_post_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            sender_id,
            NotificationType::Comment,
            Some(root_post_id),
        )
        .await
    }

    /// Create a follow notification.
    pub async fn notify_follow(
        &self,
        recipient_id: &str,
        sender_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(recipient_id, sender_id, NotificationType::Follow, None)
            .await
    }

    /// Create a mention notification.
    pub async fn notify_mention(
        &self,
        recipient_id: &str,
        sender_id: &str,
        post_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(
            recipient_id,
            sender_id,
            NotificationType::Mention,
            Some(post_id),
        )
        .await
    }

    /// Create a notification of an explicit type (manual/system entry point).
    pub async fn create(
        &self,
        recipient_id: &str,
        sender_id: &str,
        notification_type: NotificationType,
        post_id: Option<&str>,
    ) -> AppResult<Option<notification::Model>> {
        self.create_internal(recipient_id, sender_id, notification_type, post_id)
            .await
    }

    /// Internal helper to create notifications.
    ///
    /// Self-interactions are silent: recipient == sender creates nothing.
    async fn create_internal(
        &self,
        recipient_id: &str,
        sender_id: &str,
        notification_type: NotificationType,
        post_id: Option<&str>,
    ) -> AppResult<Option<notification::Model>> {
        if recipient_id == sender_id {
            return Ok(None);
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.to_string()),
            sender_id: Set(sender_id.to_string()),
            notification_type: Set(notification_type),
            post_id: Set(post_id.map(std::string::ToString::to_string)),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;
        Ok(Some(notification))
    }

    /// Get decorated notifications for a user (newest first).
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<NotificationView>> {
        let notifications = self
            .notification_repo
            .find_by_recipient(user_id, limit, until_id, false)
            .await?;

        // Batch-resolve sender usernames for rendering
        let mut sender_ids: Vec<String> =
            notifications.iter().map(|n| n.sender_id.clone()).collect();
        sender_ids.sort();
        sender_ids.dedup();

        let senders = self.user_repo.find_by_ids(&sender_ids).await?;
        let username_of = |id: &str| -> Option<String> {
            senders
                .iter()
                .find(|u| u.id == id)
                .map(|u| u.username.clone())
        };

        let now = Utc::now();
        Ok(notifications
            .into_iter()
            .map(|n| {
                let sender_username = username_of(&n.sender_id);
                let display_name = sender_username.as_deref().unwrap_or("someone");
                let body = render_body(&n.notification_type, display_name);
                let created: DateTime<Utc> = n.created_at.into();
                NotificationView {
                    id: n.id,
                    notification_type: n.notification_type,
                    sender_id: n.sender_id,
                    sender_username,
                    post_id: n.post_id,
                    is_read: n.is_read,
                    created_at: created.to_rfc3339(),
                    age: relative_age(created, now),
                    body,
                }
            })
            .collect())
    }

    /// Mark a notification as read. Idempotent.
    ///
    /// Someone else's notification answers `NotFound`, same as a missing one,
    /// so ids cannot be probed.
    pub async fn mark_read(&self, owner_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self.notification_repo.find_by_id(notification_id).await?;
        match notification {
            Some(n) if n.recipient_id == owner_id => {
                self.notification_repo.mark_as_read(notification_id).await
            }
            _ => Err(AppError::NotFound(format!(
                "Notification not found: {notification_id}"
            ))),
        }
    }

    /// Delete every notification addressed to a user.
    pub async fn clear_all(&self, owner_id: &str) -> AppResult<u64> {
        self.notification_repo
            .delete_all_for_recipient(owner_id)
            .await
    }

    /// Count unread notifications for a user.
    pub async fn unread_count(&self, owner_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(owner_id).await
    }

    /// Retract the like notifications a sender produced for a post.
    pub async fn retract_like(
        &self,
        recipient_id: &str,
        sender_id: &str,
        post_id: &str,
    ) -> AppResult<u64> {
        self.notification_repo
            .delete_like_for_post(recipient_id, sender_id, post_id)
            .await
    }

    /// Delete every notification referencing any of the given posts.
    pub async fn delete_for_posts(&self, post_ids: &[String]) -> AppResult<u64> {
        self.notification_repo.delete_for_posts(post_ids).await
    }

    /// Delete every notification where the user is sender or recipient.
    pub async fn delete_involving_user(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.delete_involving_user(user_id).await
    }
}

/// Render the display line for a notification.
fn render_body(notification_type: &NotificationType, sender: &str) -> String {
    match notification_type {
        NotificationType::Like => format!("{sender} liked your post"),
        NotificationType::CommentLike => format!("{sender} liked your comment"),
        NotificationType::Comment => format!("{sender} commented on your post"),
        NotificationType::Follow => format!("{sender} started following you"),
        NotificationType::Repost => format!("{sender} reposted your post"),
        NotificationType::Mention => format!("{sender} mentioned you in a post"),
        NotificationType::System => "System notification".to_string(),
    }
}

/// Format a creation time as a relative age.
///
/// Thresholds: under a minute "Ns", under an hour "Nm", under a day "Nh",
/// under a week "Nd", otherwise a short calendar date.
fn relative_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created_at).num_seconds().max(0);

    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h", seconds / 3600)
    } else if seconds < 604_800 {
        format!("{}d", seconds / 86_400)
    } else {
        created_at.format("%b %d, %Y").to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service_with(
        notification_results: Vec<Vec<notification::Model>>,
    ) -> NotificationService {
        let mut mock = MockDatabase::new(DatabaseBackend::Postgres);
        for result in notification_results {
            mock = mock.append_query_results([result]);
        }
        let notification_db = Arc::new(mock.into_connection());
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        NotificationService::new(
            NotificationRepository::new(notification_db),
            UserRepository::new(user_db),
        )
    }

    fn create_test_notification(id: &str, recipient: &str, sender: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient.to_string(),
            sender_id: sender.to_string(),
            notification_type: NotificationType::Like,
            post_id: Some("post1".to_string()),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_relative_age_seconds() {
        let now = Utc::now();
        assert_eq!(relative_age(now - Duration::seconds(42), now), "42s");
    }

    #[test]
    fn test_relative_age_minutes() {
        let now = Utc::now();
        assert_eq!(relative_age(now - Duration::seconds(125), now), "2m");
    }

    #[test]
    fn test_relative_age_hours() {
        let now = Utc::now();
        assert_eq!(relative_age(now - Duration::hours(5), now), "5h");
    }

    #[test]
    fn test_relative_age_days() {
        let now = Utc::now();
        assert_eq!(relative_age(now - Duration::days(3), now), "3d");
    }

    #[test]
    fn test_relative_age_calendar_date_past_a_week() {
        let now = Utc::now();
        let old = now - Duration::days(30);
        let formatted = relative_age(old, now);
        assert!(formatted.contains(',')); // "Jan 05, 2026" style
    }

    #[test]
    fn test_relative_age_boundary_minute() {
        let now = Utc::now();
        assert_eq!(relative_age(now - Duration::seconds(59), now), "59s");
        assert_eq!(relative_age(now - Duration::seconds(60), now), "1m");
    }

    #[test]
    fn test_relative_age_future_clamped() {
        let now = Utc::now();
        assert_eq!(relative_age(now + Duration::seconds(30), now), "0s");
    }

    #[test]
    fn test_render_body_per_type() {
        assert_eq!(render_body(&NotificationType::Like, "alice"), "alice liked your post");
        assert_eq!(
            render_body(&NotificationType::CommentLike, "alice"),
            "alice liked your comment"
        );
        assert_eq!(
            render_body(&NotificationType::Comment, "bob"),
            "bob commented on your post"
        );
        assert_eq!(
            render_body(&NotificationType::Follow, "carol"),
            "carol started following you"
        );
        assert_eq!(
            render_body(&NotificationType::Repost, "dan"),
            "dan reposted your post"
        );
        assert_eq!(
            render_body(&NotificationType::Mention, "eve"),
            "eve mentioned you in a post"
        );
    }

    #[tokio::test]
    async fn test_self_notification_is_silent() {
        // No query results appended: a write would fail the mock, so the
        // self-guard must short-circuit before any database access.
        let service = service_with(vec![]);

        let result = service
            .notify_like("user1", "user1", "post1", false)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_wrong_owner_is_not_found() {
        let n = create_test_notification("n1", "user1", "user2");
        let service = service_with(vec![vec![n]]);

        let result = service.mark_read("intruder", "n1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_read_missing_is_not_found() {
        let service = service_with(vec![vec![]]);

        let result = service.mark_read("user1", "ghost").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
