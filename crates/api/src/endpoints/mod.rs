//! API endpoints.

mod auth;
mod feed;
mod notifications;
mod posts;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/posts", posts::router())
        .nest("/feed", feed::router())
        .nest("/notifications", notifications::router())
        .nest("/users", users::router())
}
