//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use shoal_core::{
    EngagementService, FeedService, FollowingService, NotificationService, PostService,
    UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub engagement_service: EngagementService,
    pub notification_service: NotificationService,
    pub following_service: FollowingService,
    pub feed_service: FeedService,
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user row and stashes it in
/// the request extensions; handlers pick it up through `AuthUser` /
/// `MaybeAuthUser`. Requests without a valid token pass through
/// unauthenticated and fail only where a handler demands a user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        if let Ok(user) = state.user_service.authenticate_by_token(token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}
