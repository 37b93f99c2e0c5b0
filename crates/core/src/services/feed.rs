//! Feed assembly.
//!
//! Read-side queries joining top-level posts with their nested comment
//! trees. All population goes through one bounded-depth traversal; nothing
//! here recurses past [`MAX_COMMENT_DEPTH`] even over malformed data.

use crate::services::post::{MAX_COMMENT_DEPTH, decode_ids, decode_media};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shoal_common::AppResult;
use shoal_db::{
    entities::post::{self, MediaItem, PostKind},
    entities::user,
    repositories::{FollowingRepository, PostRepository, UserRepository},
};

/// How many followed users feed the home timeline at most.
const MAX_FEED_AUTHORS: u64 = 10_000;

/// Feed service for read-side display trees.
#[derive(Clone)]
pub struct FeedService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    following_repo: FollowingRepository,
}

/// Author summary attached to every populated entity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            name: u.name.clone(),
            avatar_url: u.avatar_url.clone(),
        }
    }
}

/// A content entity populated for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub kind: PostKind,
    pub content: Option<String>,
    pub author: Option<UserSummary>,
    pub depth: i32,
    pub parent_id: Option<String>,
    pub root_id: Option<String>,
    pub original_post_id: Option<String>,
    pub media: Vec<MediaItem>,
    pub liker_ids: Vec<String>,
    pub reposter_ids: Vec<String>,
    pub like_count: usize,
    pub repost_count: usize,
    /// Raw child ids; left unexpanded when the depth budget runs out.
    pub child_ids: Vec<String>,
    /// Populated child comments, insertion order, up to the depth budget.
    pub comments: Vec<PostView>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        following_repo: FollowingRepository,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            following_repo,
        }
    }

    /// Home feed: own and followed authors' top-level posts, newest first,
    /// each populated with up to two levels of comments.
    pub async fn get_feed(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<PostView>> {
        let followings = self
            .following_repo
            .find_following(user_id, MAX_FEED_AUTHORS, None)
            .await?;

        let mut author_ids: Vec<String> =
            followings.into_iter().map(|f| f.followee_id).collect();
        author_ids.push(user_id.to_string());

        let posts = self.post_repo.find_feed(&author_ids, limit, until_id).await?;

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            views.push(self.populate(post, MAX_COMMENT_DEPTH as usize).await?);
        }
        Ok(views)
    }

    /// One entity with its full comment subtree, author info at every level.
    pub async fn get_thread(&self, post_id: &str) -> AppResult<PostView> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.populate(post, MAX_COMMENT_DEPTH as usize).await
    }

    /// The populated comment list under one entity.
    pub async fn get_comments(&self, post_id: &str) -> AppResult<Vec<PostView>> {
        let parent = self.post_repo.get_by_id(post_id).await?;
        let child_ids = decode_ids(&parent.child_ids);
        let children = self.post_repo.find_by_ids(&child_ids).await?;

        let mut views = Vec::with_capacity(children.len());
        for child in children {
            views.push(self.populate(child, (MAX_COMMENT_DEPTH as usize).saturating_sub(1)).await?);
        }
        Ok(views)
    }

    /// Populate a single entity for display (used for read-after-write
    /// responses from the interaction paths).
    pub async fn view_of(&self, post: post::Model) -> AppResult<PostView> {
        self.populate(post, MAX_COMMENT_DEPTH as usize).await
    }

    /// Depth-limited population. `budget` is how many comment levels below
    /// this entity may still be expanded; at zero, child ids stay raw.
    fn populate<'a>(
        &'a self,
        post: post::Model,
        budget: usize,
    ) -> futures::future::BoxFuture<'a, AppResult<PostView>> {
        Box::pin(async move {
            let author = self.user_repo.find_by_id(&post.author_id).await?;
            let child_ids = decode_ids(&post.child_ids);

            let mut comments = Vec::new();
            if budget > 0 && !child_ids.is_empty() {
                let children = self.post_repo.find_by_ids(&child_ids).await?;
                for child in children {
                    comments.push(self.populate(child, budget - 1).await?);
                }
            }

            Ok(build_view(post, author.as_ref(), child_ids, comments))
        })
    }
}

fn build_view(
    post: post::Model,
    author: Option<&user::Model>,
    child_ids: Vec<String>,
    comments: Vec<PostView>,
) -> PostView {
    let likers = decode_ids(&post.liker_ids);
    let reposters = decode_ids(&post.reposter_ids);
    let created: DateTime<Utc> = post.created_at.into();

    PostView {
        id: post.id,
        kind: post.kind,
        content: post.content,
        author: author.map(Into::into),
        depth: post.depth,
        parent_id: post.parent_id,
        root_id: post.root_id,
        original_post_id: post.original_post_id,
        media: decode_media(&post.media),
        like_count: likers.len(),
        repost_count: reposters.len(),
        liker_ids: likers,
        reposter_ids: reposters,
        child_ids,
        comments,
        created_at: created.to_rfc3339(),
        updated_at: post.updated_at.map(|dt| {
            let dt: DateTime<Utc> = dt.into();
            dt.to_rfc3339()
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn make_post(id: &str, author_id: &str, kind: PostKind, depth: i32) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            kind,
            content: Some(format!("content of {id}")),
            depth,
            parent_id: None,
            root_id: None,
            original_post_id: None,
            child_ids: json!([]),
            liker_ids: json!([]),
            reposter_ids: json!([]),
            media: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn make_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$test".to_string(),
            token: None,
            name: Some("Test".to_string()),
            avatar_url: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_thread_missing_returns_not_found() {
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let following_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FeedService::new(
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            FollowingRepository::new(following_db),
        );

        let result = service.get_thread("ghost").await;
        assert!(matches!(
            result,
            Err(shoal_common::AppError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_populate_leaf_post() {
        let mut post = make_post("p1", "user1", PostKind::Post, 0);
        post.liker_ids = json!(["u2", "u3"]);

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![post]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![make_user("user1", "alice")]])
                .into_connection(),
        );
        let following_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FeedService::new(
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            FollowingRepository::new(following_db),
        );

        let view = service.get_thread("p1").await.unwrap();
        assert_eq!(view.like_count, 2);
        assert_eq!(view.author.unwrap().username, "alice");
        assert!(view.comments.is_empty());
    }

    #[tokio::test]
    async fn test_populate_expands_nested_comments() {
        let mut root = make_post("p1", "user1", PostKind::Post, 0);
        root.child_ids = json!(["c1"]);

        let mut c1 = make_post("c1", "user2", PostKind::Comment, 1);
        c1.parent_id = Some("p1".to_string());
        c1.root_id = Some("p1".to_string());
        c1.child_ids = json!(["c2"]);

        let mut c2 = make_post("c2", "user2", PostKind::Comment, 2);
        c2.parent_id = Some("c1".to_string());
        c2.root_id = Some("p1".to_string());

        // Query order: root, c1 (children of root), c2 (children of c1)
        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![root]])
                .append_query_results([vec![c1]])
                .append_query_results([vec![c2]])
                .into_connection(),
        );
        // Author lookups: one per populated node
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![make_user("user1", "alice")]])
                .append_query_results([vec![make_user("user2", "bob")]])
                .append_query_results([vec![make_user("user2", "bob")]])
                .into_connection(),
        );
        let following_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FeedService::new(
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            FollowingRepository::new(following_db),
        );

        let view = service.get_thread("p1").await.unwrap();
        assert_eq!(view.comments.len(), 1);
        let level1 = &view.comments[0];
        assert_eq!(level1.id, "c1");
        assert_eq!(level1.comments.len(), 1);
        let level2 = &level1.comments[0];
        assert_eq!(level2.id, "c2");
        // Depth budget exhausted: level-2 children stay unexpanded
        assert!(level2.comments.is_empty());
        assert_eq!(level2.root_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_depth_budget_stops_expansion_on_malformed_chain() {
        // A depth-2 comment that (malformed) still lists children: the
        // traversal must not descend past the budget.
        let mut root = make_post("p1", "user1", PostKind::Post, 0);
        root.child_ids = json!(["c1"]);

        let mut c1 = make_post("c1", "user2", PostKind::Comment, 1);
        c1.child_ids = json!(["c2"]);

        let mut c2 = make_post("c2", "user2", PostKind::Comment, 2);
        c2.child_ids = json!(["c3"]); // malformed extra level

        let post_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![root]])
                .append_query_results([vec![c1]])
                .append_query_results([vec![c2]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![make_user("user1", "alice")]])
                .append_query_results([vec![make_user("user2", "bob")]])
                .append_query_results([vec![make_user("user2", "bob")]])
                .into_connection(),
        );
        let following_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FeedService::new(
            PostRepository::new(post_db),
            UserRepository::new(user_db),
            FollowingRepository::new(following_db),
        );

        let view = service.get_thread("p1").await.unwrap();
        let c2_view = &view.comments[0].comments[0];
        // The malformed child id is reported raw but never fetched
        assert_eq!(c2_view.child_ids, vec!["c3"]);
        assert!(c2_view.comments.is_empty());
    }
}
