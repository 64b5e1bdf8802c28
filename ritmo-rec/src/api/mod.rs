//! REST and SSE API for the recognition service
//!
//! Exposes recognition control, the shared status projection, history, and
//! preview playback over HTTP, plus a server-sent-events stream of
//! recognition lifecycle events.

pub mod handlers;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::player::PreviewPlayer;
use crate::session::SessionHandle;
use crate::state::SharedState;
use ritmo_common::db::HistoryStore;
use ritmo_common::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Recognition session command handle
    pub session: SessionHandle,
    /// Shared session projection (phase, last track, volume, status line)
    pub state: Arc<SharedState>,
    /// Persisted recognition history
    pub history: HistoryStore,
    /// Preview clip playback
    pub player: PreviewPlayer,
    /// Recognition event fan-out for SSE
    pub events: EventBus,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                // Recognition control
                .route("/recognize/start", post(handlers::start_recognition))
                .route("/recognize/cancel", post(handlers::cancel_recognition))
                .route("/status", get(handlers::get_status))
                // History
                .route("/history", get(handlers::get_history))
                .route("/history", delete(handlers::clear_history))
                // Preview playback
                .route("/preview/play", post(handlers::play_preview))
                .route("/preview/stop", post(handlers::stop_preview))
                // SSE events
                .route("/events", get(handlers::sse_handler)),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "ritmo-rec",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port
    }))
}
