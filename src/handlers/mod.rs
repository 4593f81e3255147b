//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod health;
pub mod stream;
pub mod title;

use crate::config::Settings;
use crate::services::CompletionGateway;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub gateway: Arc<CompletionGateway>,
}

/// Create application router
pub async fn create_router(settings: Settings) -> Result<Router> {
    let gateway = Arc::new(CompletionGateway::new(&settings)?);

    let app_state = Arc::new(AppState { settings, gateway });

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let router = Router::new()
        .route(
            "/api/chat/stream",
            post(stream::handle_chat_stream).options(stream::handle_stream_preflight),
        )
        .route("/api/chat/complete", post(stream::handle_chat_complete))
        .route("/api/chat/title", post(title::handle_chat_title))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(app_state)
        .layer(middleware_stack);

    Ok(router)
}
