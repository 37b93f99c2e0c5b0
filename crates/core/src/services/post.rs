//! Post service.
//!
//! Creation rules for the polymorphic content entity (posts, comments,
//! reposts) and the cascade deletion path.

use std::collections::HashSet;
use std::sync::Arc;

use crate::mentions::extract_mentions;
use crate::services::notification::NotificationService;
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shoal_common::{AppError, AppResult, IdGenerator, StorageBackend};
use shoal_db::{
    entities::post::{self, MediaItem, MediaType, PostKind},
    repositories::{PostRepository, UserRepository},
};
use validator::Validate;

/// Maximum comment nesting depth. A post is depth 0; comments on comments on
/// a post reach depth 2, and nothing nests deeper.
pub const MAX_COMMENT_DEPTH: i32 = 2;

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    storage: Option<Arc<dyn StorageBackend>>,
    id_gen: IdGenerator,
}

/// A media attachment supplied at creation time.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInput {
    pub media_type: MediaType,
    pub url: String,
    pub storage_key: String,
}

impl From<MediaInput> for MediaItem {
    fn from(input: MediaInput) -> Self {
        Self {
            media_type: input.media_type,
            url: input.url,
            storage_key: input.storage_key,
        }
    }
}

/// Input for creating a top-level post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(max = 5000))]
    pub content: Option<String>,

    #[validate(length(max = 8))]
    #[serde(default)]
    pub media: Vec<MediaInput>,
}

/// Input for creating a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(max = 5000))]
    pub content: Option<String>,

    #[validate(length(max = 8))]
    #[serde(default)]
    pub media: Vec<MediaInput>,
}

impl PostService {
    /// Create a new post service.
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
            storage: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post service with a storage backend for media blobs.
    #[must_use]
    pub fn with_storage(
        post_repo: PostRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            notifications,
            storage: Some(storage),
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the storage backend.
    pub fn set_storage(&mut self, storage: Arc<dyn StorageBackend>) {
        self.storage = Some(storage);
    }

    /// Create a top-level post (depth 0, no parent).
    pub async fn create_post(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        input.validate()?;
        ensure_has_body(input.content.as_deref(), &input.media)?;

        // Confirm the author exists before writing
        let _author = self.user_repo.get_by_id(author_id).await?;

        let content = normalize_content(input.content);
        let media: Vec<MediaItem> = input.media.into_iter().map(Into::into).collect();

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            kind: Set(PostKind::Post),
            content: Set(content),
            depth: Set(0),
            parent_id: Set(None),
            root_id: Set(None),
            original_post_id: Set(None),
            child_ids: Set(json!([])),
            liker_ids: Set(json!([])),
            reposter_ids: Set(json!([])),
            media: Set(json!(media)),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.post_repo.create(model).await?;
        self.user_repo.increment_posts_count(author_id).await?;

        self.fan_out_mentions(author_id, created.content.as_deref(), &created.id)
            .await;

        tracing::debug!(post_id = %created.id, author_id = %author_id, "Created post");
        Ok(created)
    }

    /// Create a comment under an existing post or comment.
    ///
    /// Depth and root follow the parent: a comment on a post sits at depth 1
    /// with the post as root; a comment on a comment inherits the parent's
    /// root and sits one level deeper, up to [`MAX_COMMENT_DEPTH`].
    pub async fn create_comment(
        &self,
        author_id: &str,
        parent_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<post::Model> {
        input.validate()?;
        ensure_has_body(input.content.as_deref(), &input.media)?;

        let parent = self.post_repo.get_by_id(parent_id).await?;

        let depth = child_depth(&parent);
        if depth > MAX_COMMENT_DEPTH {
            return Err(AppError::DepthExceeded(format!(
                "comments cannot nest deeper than {MAX_COMMENT_DEPTH} levels"
            )));
        }

        let root_id = root_of(&parent);
        let content = normalize_content(input.content);
        let media: Vec<MediaItem> = input.media.into_iter().map(Into::into).collect();

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            kind: Set(PostKind::Comment),
            content: Set(content),
            depth: Set(depth),
            parent_id: Set(Some(parent.id.clone())),
            root_id: Set(Some(root_id.clone())),
            original_post_id: Set(None),
            child_ids: Set(json!([])),
            liker_ids: Set(json!([])),
            reposter_ids: Set(json!([])),
            media: Set(json!(media)),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.post_repo.create(model).await?;
        self.user_repo.increment_posts_count(author_id).await?;

        // Append to the parent's ordered child list
        self.append_child(&parent, &created.id).await?;

        // Notify the parent's author; the related entity is the root post so
        // the notification opens the whole thread
        if let Err(e) = self
            .notifications
            .notify_comment(&parent.author_id, author_id, &root_id)
            .await
        {
            tracing::warn!(error = %e, comment_id = %created.id, "Failed to create comment notification");
        }

        self.fan_out_mentions(author_id, created.content.as_deref(), &created.id)
            .await;

        tracing::debug!(comment_id = %created.id, parent_id = %parent_id, depth = depth, "Created comment");
        Ok(created)
    }

    /// Get a post by ID.
    pub async fn get(&self, id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(id).await
    }

    /// Every entity a user has authored (account deletion sweep).
    pub async fn authored_by(&self, author_id: &str) -> AppResult<Vec<post::Model>> {
        self.post_repo.find_all_by_author(author_id).await
    }

    /// Delete a content entity and everything hanging off it.
    ///
    /// Descendants are enumerated before anything is deleted; media blobs go
    /// first (best effort), then notifications, then entities bottom-up.
    /// Returns the deleted entity's kind so callers can phrase the response.
    pub async fn delete(&self, post_id: &str, requester_id: &str) -> AppResult<PostKind> {
        let entity = self.post_repo.get_by_id(post_id).await?;

        if entity.author_id != requester_id {
            return Err(AppError::Forbidden(
                "Cannot delete another user's post".to_string(),
            ));
        }

        let levels = self.collect_descendants(&entity).await?;

        let mut all_ids: Vec<String> = vec![entity.id.clone()];
        for level in &levels {
            all_ids.extend(level.iter().map(|p| p.id.clone()));
        }

        // Media blobs, best effort: a storage failure never aborts deletion
        self.delete_media(&entity).await;
        for level in &levels {
            for descendant in level {
                self.delete_media(descendant).await;
            }
        }

        // Notifications referencing the entity or any descendant
        self.notifications.delete_for_posts(&all_ids).await?;

        // Detach from the parent's ordered child list
        if let Some(ref parent_id) = entity.parent_id {
            if let Some(parent) = self.post_repo.find_by_id(parent_id).await? {
                self.remove_child(&parent, &entity.id).await?;
            }
        }

        // Delete bottom-up: deepest level first, the entity itself last
        for level in levels.iter().rev() {
            let ids: Vec<String> = level.iter().map(|p| p.id.clone()).collect();
            self.post_repo.delete_many(&ids).await?;
            for descendant in level {
                let _ = self
                    .user_repo
                    .decrement_posts_count(&descendant.author_id)
                    .await;
            }
        }
        self.post_repo.delete(&entity.id).await?;
        let _ = self.user_repo.decrement_posts_count(&entity.author_id).await;

        tracing::debug!(
            post_id = %entity.id,
            removed = all_ids.len(),
            "Cascade-deleted entity"
        );
        Ok(entity.kind)
    }

    /// Enumerate the descendant tree level by level.
    ///
    /// The walk is bounded by [`MAX_COMMENT_DEPTH`] and keeps a visited set,
    /// so malformed or cyclic child references cannot loop it.
    async fn collect_descendants(&self, entity: &post::Model) -> AppResult<Vec<Vec<post::Model>>> {
        let mut levels: Vec<Vec<post::Model>> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(entity.id.clone());

        let mut frontier: Vec<String> = decode_ids(&entity.child_ids)
            .into_iter()
            .filter(|id| visited.insert(id.clone()))
            .collect();

        for _ in 0..MAX_COMMENT_DEPTH {
            if frontier.is_empty() {
                break;
            }

            let level = self.post_repo.find_by_ids(&frontier).await?;
            frontier = level
                .iter()
                .flat_map(|p| decode_ids(&p.child_ids))
                .filter(|id| visited.insert(id.clone()))
                .collect();
            levels.push(level);
        }

        Ok(levels)
    }

    /// Delete an entity's media blobs from storage, logging failures.
    async fn delete_media(&self, entity: &post::Model) {
        let Some(ref storage) = self.storage else {
            return;
        };

        for item in decode_media(&entity.media) {
            if let Err(e) = storage.delete(&item.storage_key).await {
                tracing::warn!(
                    error = %e,
                    storage_key = %item.storage_key,
                    post_id = %entity.id,
                    "Failed to delete media blob, proceeding with deletion"
                );
            }
        }
    }

    /// Append a child id to a parent's ordered child list.
    async fn append_child(&self, parent: &post::Model, child_id: &str) -> AppResult<()> {
        let mut child_ids = decode_ids(&parent.child_ids);
        child_ids.push(child_id.to_string());

        let mut active: post::ActiveModel = parent.clone().into();
        active.child_ids = Set(json!(child_ids));
        active.updated_at = Set(Some(Utc::now().into()));
        self.post_repo.update(active).await?;
        Ok(())
    }

    /// Remove a child id from a parent's ordered child list.
    async fn remove_child(&self, parent: &post::Model, child_id: &str) -> AppResult<()> {
        let mut child_ids = decode_ids(&parent.child_ids);
        child_ids.retain(|id| id != child_id);

        let mut active: post::ActiveModel = parent.clone().into();
        active.child_ids = Set(json!(child_ids));
        active.updated_at = Set(Some(Utc::now().into()));
        self.post_repo.update(active).await?;
        Ok(())
    }

    /// Notify every mentioned user. The API boundary already validated the
    /// tokens; unresolvable ones are simply skipped here.
    async fn fan_out_mentions(&self, author_id: &str, content: Option<&str>, post_id: &str) {
        let Some(text) = content else { return };

        for username in extract_mentions(text) {
            match self.user_repo.find_by_username(&username).await {
                Ok(Some(mentioned)) => {
                    if let Err(e) = self
                        .notifications
                        .notify_mention(&mentioned.id, author_id, post_id)
                        .await
                    {
                        tracing::warn!(error = %e, username = %username, "Failed to create mention notification");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, username = %username, "Failed to resolve mention");
                }
            }
        }
    }
}

/// Depth a new comment gets under this parent.
fn child_depth(parent: &post::Model) -> i32 {
    if parent.kind == PostKind::Comment {
        parent.depth + 1
    } else {
        1
    }
}

/// Root post id for a new comment under this parent.
fn root_of(parent: &post::Model) -> String {
    if parent.kind == PostKind::Comment {
        parent.root_id.clone().unwrap_or_else(|| parent.id.clone())
    } else {
        parent.id.clone()
    }
}

/// Empty content with no media is rejected; whitespace does not count.
fn ensure_has_body(content: Option<&str>, media: &[MediaInput]) -> AppResult<()> {
    let has_text = content.is_some_and(|c| !c.trim().is_empty());
    if !has_text && media.is_empty() {
        return Err(AppError::Validation(
            "Content or media required".to_string(),
        ));
    }
    Ok(())
}

/// Drop whitespace-only content down to `None`.
fn normalize_content(content: Option<String>) -> Option<String> {
    content.filter(|c| !c.trim().is_empty())
}

/// Decode a JSON id array column. Malformed data decodes to empty.
pub(crate) fn decode_ids(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// Decode the JSON media column. Malformed data decodes to empty.
pub(crate) fn decode_media(value: &serde_json::Value) -> Vec<MediaItem> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
