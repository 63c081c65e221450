//! Axum router construction for the writer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/events` -- `WebSocket` live event stream
/// - `POST /api/register`, `/api/join_queue`, `/api/leave_queue`
/// - `GET /api/status`, `/api/get_draft`, `/api/myinfo`
/// - `POST /api/update_draft`, `/api/submit`
/// - `GET /api/feed`, `/api/book`, `/api/entries`
///
/// CORS allows any origin so a separately hosted client can call the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/events", get(ws::ws_events))
        // Participants and queue
        .route("/api/register", post(handlers::register))
        .route("/api/join_queue", post(handlers::join_queue))
        .route("/api/leave_queue", post(handlers::leave_queue))
        .route("/api/myinfo", get(handlers::myinfo))
        // Turn
        .route("/api/status", get(handlers::status))
        .route("/api/update_draft", post(handlers::update_draft))
        .route("/api/get_draft", get(handlers::get_draft))
        .route("/api/submit", post(handlers::submit))
        // Ledger
        .route("/api/feed", get(handlers::feed))
        .route("/api/book", get(handlers::book))
        .route("/api/entries", get(handlers::entries))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
