//! Feed endpoint.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use shoal_common::AppResult;
use shoal_core::PostView;

use crate::{extractors::AuthUser, middleware::AppState};

/// Feed request parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    /// Maximum results (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

const fn max_limit() -> u64 {
    100
}

/// Home feed: own and followed authors' posts with nested comments.
async fn feed(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<PostView>>> {
    let limit = query.limit.min(max_limit());
    let views = state
        .feed_service
        .get_feed(&user.id, limit, query.until_id.as_deref())
        .await?;
    Ok(Json(views))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(feed))
}
