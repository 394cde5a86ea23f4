//! Peerlink server entry point.

use std::sync::Arc;

use axum::{Router, routing::get};
use peerlink_api::{AppState, router as api_router, session_handler};
use peerlink_common::{Config, IdGenerator};
use peerlink_core::{ConnectionRegistry, GroupService, RoutingService, SignalingRelay};
use peerlink_db::repositories::{GroupMessageRepository, GroupRepository, MessageRepository};
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
                .unwrap_or_else(|_| "peerlink=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting peerlink relay server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to the store
    let db = peerlink_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    peerlink_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let message_repo = MessageRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let group_message_repo = GroupMessageRepository::new(Arc::clone(&db));

    // Initialize the registry and services
    let registry = ConnectionRegistry::new(
        config.relay.outbound_queue,
        config.relay.overflow_policy,
    );
    let routing = RoutingService::new(message_repo, registry.clone());
    let groups = GroupService::new(
        group_repo,
        group_message_repo,
        registry.clone(),
        &config.relay,
    );
    let signaling = SignalingRelay::new(registry.clone());

    // Create app state
    let state = AppState {
        registry,
        routing,
        groups,
        signaling,
        id_gen: IdGenerator::new(),
    };

    // Build router
    let app = Router::new()
        .route("/ws/{id}", get(session_handler))
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
