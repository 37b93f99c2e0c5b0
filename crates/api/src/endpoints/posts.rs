//! Post endpoints: creation, thread views, likes, reposts, comments,
//! cascade deletion.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shoal_common::AppResult;
use shoal_core::{CreateCommentInput, CreatePostInput, PostView};
use shoal_db::entities::post::PostKind;

use crate::{extractors::AuthUser, middleware::AppState};

/// Create post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(flatten)]
    pub input: CreatePostInput,
}

/// Create a new top-level post.
///
/// Mention tokens are validated here, before anything is written; the whole
/// request fails on the first sweep with one aggregated error.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<PostView>> {
    if let Some(ref content) = req.input.content {
        state.user_service.verify_mentions(content).await?;
    }

    let post = state.post_service.create_post(&user.id, req.input).await?;
    let view = state.feed_service.view_of(post).await?;
    Ok(Json(view))
}

/// Get a thread: one entity fully populated with its comment subtree.
async fn show(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let view = state.feed_service.get_thread(&id).await?;
    Ok(Json(view))
}

/// Delete response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub kind: PostKind,
}

/// Cascade-delete an entity and all of its descendants.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let kind = state.post_service.delete(&id, &user.id).await?;
    Ok(Json(DeleteResponse { kind }))
}

/// Toggle a like; the response reflects the mutation just applied.
async fn toggle_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let updated = state.engagement_service.toggle_like(&user.id, &id).await?;
    let view = state.feed_service.view_of(updated).await?;
    Ok(Json(view))
}

/// Toggle a repost; the response is the updated original.
async fn toggle_repost(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let updated = state
        .engagement_service
        .toggle_repost(&user.id, &id)
        .await?;
    let view = state.feed_service.view_of(updated).await?;
    Ok(Json(view))
}

/// Create comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(flatten)]
    pub input: CreateCommentInput,
}

/// Create a comment under a post or another comment.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<PostView>> {
    if let Some(ref content) = req.input.content {
        state.user_service.verify_mentions(content).await?;
    }

    let comment = state
        .post_service
        .create_comment(&user.id, &id, req.input)
        .await?;
    let view = state.feed_service.view_of(comment).await?;
    Ok(Json(view))
}

/// Fetch the populated comment tree under an entity.
async fn comments(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PostView>>> {
    let views = state.feed_service.get_comments(&id).await?;
    Ok(Json(views))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}", get(show).delete(remove))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/repost", post(toggle_repost))
        .route("/{id}/comments", get(comments).post(create_comment))
}
