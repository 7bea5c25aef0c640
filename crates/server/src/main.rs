//! Decision Jar server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use jar_api::{middleware::AppState, router as api_router};
use jar_common::Config;
use jar_core::{IdeaService, JarService, NotificationService, UserService, VoteService};
use jar_db::repositories::{
    IdeaRepository, JarRepository, NotificationRepository, UserRepository, VoteRepository,
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
#[allow(clippy::expect_used)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jar_server=debug,jar_api=debug,jar_core=debug,jar_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    info!("Starting Decision Jar server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = jar_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    jar_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let jar_repo = JarRepository::new(Arc::clone(&db));
    let idea_repo = IdeaRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Initialize services
    let notification_service =
        NotificationService::new(notification_repo, jar_repo.clone(), user_repo.clone());
    let user_service = UserService::new(user_repo.clone());
    let jar_service = JarService::new(
        jar_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let idea_service = IdeaService::new(
        idea_repo.clone(),
        jar_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let vote_service = VoteService::new(
        vote_repo,
        jar_repo,
        idea_repo,
        user_repo,
        notification_service.clone(),
        config.voting.clone(),
    );

    let state = AppState {
        user_service,
        jar_service,
        idea_service,
        vote_service,
        notification_service,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jar_api::middleware::auth_middleware,
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
