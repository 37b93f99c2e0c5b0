//! HTTP API layer for shoal.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: auth, posts, feed, notifications, users
//! - **Extractors**: authenticated-user extraction from request extensions
//! - **Middleware**: bearer-token authentication, application state
//!
//! Built on Axum 0.8 with a Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
