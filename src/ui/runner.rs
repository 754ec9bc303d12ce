//! Server bootstrap: router construction and the serve loop.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::ServerConfig,
    domain::SessionRepository,
    infrastructure::repository::InMemorySessionRepository,
    ui::{handler, signal, state::AppState},
};

/// Run the relay server until a shutdown signal arrives.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let repository: Arc<dyn SessionRepository> = Arc::new(InMemorySessionRepository::new());
    let state = Arc::new(AppState {
        repository,
        sync_timeout: std::time::Duration::from_millis(config.sync_timeout_ms),
    });

    let app = Router::new()
        .route("/api/health", get(handler::health_check))
        .route("/api/rooms", get(handler::get_rooms))
        .route("/api/rooms/{room_id}", get(handler::get_room_detail))
        .route("/ws", get(handler::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_origin)?)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(signal::shutdown_signal())
        .await?;

    Ok(())
}

fn build_cors(origin: &str) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    Ok(if origin == "*" {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origin.parse::<HeaderValue>()?)
    })
}
