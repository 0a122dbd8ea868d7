use super::state::AppState;
use crate::session::{SessionHandle, SessionOrchestrator, SessionRequest};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingRequest {
    /// Meeting link; must match the configured URL prefix.
    pub meet_link: Option<String>,

    /// Recording length in hours.
    pub duration_in_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /start-recording
/// Start a recording session; rejected while one is active.
pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> impl IntoResponse {
    let Some(link) = req.meet_link else {
        return bad_request("meetLink is required");
    };
    let Some(hours) = req.duration_in_hours else {
        return bad_request("durationInHours is required");
    };
    if !link.starts_with(&state.config.allowed_url_prefix) {
        return bad_request(format!(
            "meeting link must start with {}",
            state.config.allowed_url_prefix
        ));
    }
    if !(hours > 0.0) {
        return bad_request("durationInHours must be positive");
    }

    let (handle, stop_rx) = SessionHandle::new();
    let session_id = handle.session_id.clone();
    if state.registry.acquire(handle).await.is_err() {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "a recording session is already active".to_string(),
            }),
        )
            .into_response();
    }

    info!("starting session {} for {}", session_id, link);
    let request = SessionRequest::new(link, Duration::from_secs_f64(hours * 3600.0));
    let registry = Arc::clone(&state.registry);
    let events = state.events.clone();
    let config = (*state.config).clone();

    tokio::spawn(async move {
        let orchestrator = SessionOrchestrator::new(request, config, events);
        if let Err(err) = orchestrator.run(stop_rx).await {
            error!("session ended with error: {:#}", err);
        }
        registry.release().await;
    });

    (
        StatusCode::OK,
        Json(StartRecordingResponse {
            session_id,
            status: "started".to_string(),
            message: "recording session started".to_string(),
        }),
    )
        .into_response()
}

/// POST /stop-recording
/// Signal the active session to stop.
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    if state.registry.signal_stop().await {
        info!("stop signal sent to the active session");
        (
            StatusCode::OK,
            Json(StopRecordingResponse {
                status: "stopping".to_string(),
                message: "stop signal sent".to_string(),
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active session to stop".to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
