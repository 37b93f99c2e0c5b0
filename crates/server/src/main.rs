//! Shoal server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, middleware};
use shoal_api::{AppState, router as api_router};
use shoal_common::{Config, LocalStorage, StorageBackend};
use shoal_core::{
    EngagementService, FeedService, FollowingService, NotificationService, PostService,
    UserService,
};
use shoal_db::repositories::{
    FollowingRepository, NotificationRepository, PostRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shoal=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting shoal server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = shoal_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    shoal_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Media blob storage (used by cascade deletion)
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        PathBuf::from(&config.storage.base_path),
        config.storage.base_url.clone(),
    ));

    // Initialize services
    let notification_service =
        NotificationService::new(notification_repo.clone(), user_repo.clone());
    let post_service = PostService::with_storage(
        post_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        Arc::clone(&storage),
    );
    let engagement_service = EngagementService::new(
        post_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let following_service = FollowingService::new(
        following_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let feed_service = FeedService::new(
        post_repo.clone(),
        user_repo.clone(),
        following_repo.clone(),
    );
    let user_service = UserService::new(
        user_repo,
        following_repo,
        notification_service.clone(),
        post_service.clone(),
    );

    // Create app state
    let state = AppState {
        user_service,
        post_service,
        engagement_service,
        notification_service,
        following_service,
        feed_service,
    };

    // Build router
    let app = Router::new()
        .merge(api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            shoal_api::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
