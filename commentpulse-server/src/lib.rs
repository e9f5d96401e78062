//! # commentpulse-server
//!
//! HTTP/WebSocket front end over `commentpulse-core`.
//!
//! ## Route Structure
//!
//! ```text
//! /api/analytics
//!   POST /api/analytics/event               - Submit an event (idempotent)
//!   GET  /api/analytics/summary             - Cached window summary
//!   GET  /api/analytics/post/{post_id}      - Events for one post
//!   GET  /api/analytics/platform/{platform} - Events for one platform
//!
//! /health - Liveness + store reachability
//! /ws     - Summary broadcast subscription (optional ?platform= filter)
//! ```

pub mod error;
pub mod handlers;
pub mod state;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router over shared state.
///
/// CORS is permissive because producers are browser extensions running on
/// third-party origins.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analytics/event", post(handlers::record_event))
        .route("/api/analytics/summary", get(handlers::summary))
        .route("/api/analytics/post/{post_id}", get(handlers::post_events))
        .route(
            "/api/analytics/platform/{platform}",
            get(handlers::platform_events),
        )
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
