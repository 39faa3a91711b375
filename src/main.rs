//! lottery-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints,
//! restores the in-memory store from PostgreSQL, and spawns the
//! background persistence tasks.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lottery_gateway::api;
use lottery_gateway::app_state::AppState;
use lottery_gateway::config::LotteryConfig;
use lottery_gateway::domain::{CommentDirectory, EventBus, LotteryStore};
use lottery_gateway::persistence::postgres::PostgresPersistence;
use lottery_gateway::persistence::tasks;
use lottery_gateway::service::{LotteryService, VerificationService};
use lottery_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = LotteryConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting lottery-gateway");

    // Build domain layer
    let store = Arc::new(LotteryStore::new());
    let comments = Arc::new(CommentDirectory::new());
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Build service layer
    let lottery = Arc::new(LotteryService::new(
        Arc::clone(&store),
        Arc::clone(&comments),
        event_bus.clone(),
        config.token_salt.clone(),
    ));
    let verification = Arc::new(VerificationService::new(config.verification.clone()));

    // Attach persistence. A missing database is a warning, not a fatal
    // error: the gateway runs memory-only until the next restart.
    if config.persistence_enabled {
        match PostgresPersistence::connect(&config).await {
            Ok(persistence) => {
                persistence.init_schema().await?;
                let (activities, participants) =
                    tasks::restore_store(&store, &persistence).await?;
                tracing::info!(activities, participants, "store restored from database");

                tokio::spawn(tasks::run_snapshot_loop(
                    Arc::clone(&store),
                    persistence.clone(),
                    config.snapshot_interval_secs,
                ));
                if config.event_log_enabled {
                    tokio::spawn(tasks::run_event_log_loop(
                        Arc::clone(&store),
                        event_bus.clone(),
                        persistence.clone(),
                    ));
                }
                tokio::spawn(tasks::run_cleanup_loop(
                    persistence,
                    config.cleanup_after_days,
                ));
            }
            Err(error) => {
                tracing::warn!(%error, "database unreachable, running memory-only");
            }
        }
    }

    // Build application state
    let app_state = AppState {
        lottery,
        verification,
        comments,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
