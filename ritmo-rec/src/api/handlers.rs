//! HTTP request handlers
//!
//! Implements the recognition, history, and preview endpoints, plus the SSE
//! event stream.

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::StartOutcome;
use crate::state::SessionPhase;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use ritmo_common::db::HistoryRecord;
use ritmo_common::RecognizedTrack;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AckResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    phase: SessionPhase,
    is_active: bool,
    volume: f64,
    status_text: String,
    last_recognized: Option<RecognizedTrack>,
    preview_playing: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    entries: Vec<HistoryRecord>,
}

#[derive(Debug, Deserialize)]
pub struct PlayPreviewRequest {
    url: String,
}

// ============================================================================
// Recognition Control
// ============================================================================

/// POST /recognize/start - Begin a recognition attempt
pub async fn start_recognition(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<AckResponse>)> {
    match state.session.start().await {
        StartOutcome::Listening => {
            info!("Recognition attempt started");
            Ok((
                StatusCode::ACCEPTED,
                Json(AckResponse {
                    status: "listening".to_string(),
                }),
            ))
        }
        StartOutcome::Busy => Err(ApiError::Conflict(
            "A recognition attempt is already in progress".to_string(),
        )),
        StartOutcome::CaptureRejected => Err(ApiError::Unavailable(
            "Audio capture could not start".to_string(),
        )),
    }
}

/// POST /recognize/cancel - Abort the in-flight attempt (no-op while idle)
pub async fn cancel_recognition(State(state): State<AppState>) -> Json<AckResponse> {
    state.session.cancel();
    Json(AckResponse {
        status: "ok".to_string(),
    })
}

/// GET /status - Current session projection
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        phase: state.state.phase().await,
        is_active: state.state.is_active().await,
        volume: state.state.volume().await,
        status_text: state.state.status_text().await,
        last_recognized: state.state.last_recognized().await,
        preview_playing: state.player.is_playing(),
    })
}

// ============================================================================
// History
// ============================================================================

/// GET /history - All history entries, newest first
pub async fn get_history(State(state): State<AppState>) -> ApiResult<Json<HistoryResponse>> {
    let entries = state.history.list().await?;
    Ok(Json(HistoryResponse { entries }))
}

/// DELETE /history - Remove every history entry
pub async fn clear_history(State(state): State<AppState>) -> ApiResult<Json<AckResponse>> {
    state.history.clear().await?;
    info!("History cleared");
    Ok(Json(AckResponse {
        status: "ok".to_string(),
    }))
}

// ============================================================================
// Preview Playback
// ============================================================================

/// POST /preview/play - Fetch and play a preview clip
pub async fn play_preview(
    State(state): State<AppState>,
    Json(req): Json<PlayPreviewRequest>,
) -> ApiResult<Json<AckResponse>> {
    if req.url.trim().is_empty() {
        return Err(ApiError::BadRequest("url must not be empty".to_string()));
    }

    // Fetch happens off the handler; failures collapse to "not playing"
    let player = state.player.clone();
    tokio::spawn(async move {
        player.play(&req.url).await;
    });

    Ok(Json(AckResponse {
        status: "ok".to_string(),
    }))
}

/// POST /preview/stop - Stop preview playback (idempotent)
pub async fn stop_preview(State(state): State<AppState>) -> Json<AckResponse> {
    state.player.stop();
    Json(AckResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// SSE
// ============================================================================

/// GET /events - Stream recognition events as SSE
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match Event::default().event(event.event_type()).json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                warn!("Failed to serialize SSE event: {}", e);
                None
            }
        },
        Err(e) => {
            // Lagged subscriber: log and continue with the next event
            warn!("SSE subscriber lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keep-alive"),
    )
}
