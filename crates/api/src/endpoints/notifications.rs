//! Notification endpoints.
//!
//! The read paths here are UI chrome: they degrade to empty/zero results on
//! internal failure instead of surfacing errors, and the unread count
//! answers `{count: 0}` to unauthenticated callers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use shoal_common::AppResult;
use shoal_core::NotificationView;
use shoal_db::entities::notification::NotificationType;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
};

/// List request parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Maximum results (default: 50, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    50
}

const fn max_limit() -> u64 {
    100
}

/// List the authenticated user's notifications, newest first, decorated
/// with relative age and a rendered body.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<NotificationView>> {
    let limit = query.limit.min(max_limit());

    match state
        .notification_service
        .list(&user.id, limit, query.until_id.as_deref())
        .await
    {
        Ok(views) => Json(views),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to list notifications, degrading to empty");
            Json(Vec::new())
        }
    }
}

/// Create notification request (manual/system entry point).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub post_id: Option<String>,
}

/// Created-notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub id: String,
}

/// Create a notification with the session user as sender.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> AppResult<Json<CreatedResponse>> {
    let created = state
        .notification_service
        .create(
            &req.recipient_id,
            &user.id,
            req.notification_type,
            req.post_id.as_deref(),
        )
        .await?;

    match created {
        Some(n) => Ok(Json(CreatedResponse { id: n.id })),
        None => Err(shoal_common::AppError::BadRequest(
            "Cannot notify yourself".to_string(),
        )),
    }
}

/// Clear-all response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllResponse {
    pub count: u64,
}

/// Delete every notification addressed to the authenticated user.
async fn clear_all(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ClearAllResponse>> {
    let count = state.notification_service.clear_all(&user.id).await?;
    Ok(Json(ClearAllResponse { count }))
}

/// Unread count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Unread notification count. Unauthenticated callers get `{count: 0}`,
/// never an error status.
async fn unread_count(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
) -> Json<UnreadCountResponse> {
    let Some(user) = user else {
        return Json(UnreadCountResponse { count: 0 });
    };

    match state.notification_service.unread_count(&user.id).await {
        Ok(count) => Json(UnreadCountResponse { count }),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to count unread notifications, degrading to zero");
            Json(UnreadCountResponse { count: 0 })
        }
    }
}

/// Mark-read response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub ok: bool,
}

/// Mark one notification as read. Idempotent; 404 when the notification is
/// missing or belongs to someone else.
async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MarkReadResponse>> {
    state.notification_service.mark_read(&user.id, &id).await?;
    Ok(Json(MarkReadResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create).delete(clear_all))
        .route("/unread", get(unread_count))
        .route("/{id}/read", put(mark_read))
}
