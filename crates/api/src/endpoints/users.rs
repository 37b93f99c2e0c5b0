//! User endpoints: profiles, follow toggles, account deletion.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete as del, get, post},
};
use serde::Serialize;
use shoal_common::AppResult;
use shoal_core::FollowStats;
use shoal_db::entities::user;

use crate::{extractors::AuthUser, middleware::AppState};

/// Public profile response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub followers_count: i32,
    pub following_count: i32,
    pub posts_count: i32,
    pub created_at: String,
}

impl From<user::Model> for ProfileResponse {
    fn from(u: user::Model) -> Self {
        let created: chrono::DateTime<chrono::Utc> = u.created_at.into();
        Self {
            id: u.id,
            username: u.username,
            name: u.name,
            avatar_url: u.avatar_url,
            followers_count: u.followers_count,
            following_count: u.following_count,
            posts_count: u.posts_count,
            created_at: created.to_rfc3339(),
        }
    }
}

/// Get a user's public profile.
async fn profile(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.user_service.get_by_username(&username).await?;
    Ok(Json(user.into()))
}

/// Toggle following a user.
async fn toggle_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<FollowStats>> {
    let stats = state
        .following_service
        .toggle_follow(&user.id, &username)
        .await?;
    Ok(Json(stats))
}

/// Account deletion response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub ok: bool,
}

/// Delete the authenticated user's account and everything attached to it.
async fn delete_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DeletedResponse>> {
    state.user_service.delete_account(&user.id).await?;
    Ok(Json(DeletedResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", del(delete_me))
        .route("/{username}", get(profile))
        .route("/{username}/follow", post(toggle_follow))
}
