//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::ReportMode;
use crate::report::{format_report, split_message};

use super::commands::{Command, help_text, refresh_text, start_text, status_text};
use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/report/:mode", get(report))
        .route("/command", post(command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Check if request accepts JSON.
fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Build a report on demand.
async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(mode): Path<String>,
) -> Result<Response, AppError> {
    let mode = ReportMode::parse(&mode).ok_or_else(|| AppError::NotFound {
        message: format!("Unknown report mode: {mode}"),
    })?;

    let report = state.pipeline.build_report(mode).await;
    let text = format_report(&report);

    if accepts_json(&headers) {
        Ok(Json(ReportDto::from_report(&report, text)).into_response())
    } else {
        Ok(text.into_response())
    }
}

/// Answer a chat-style command.
async fn command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let command = Command::parse(&req.text).ok_or_else(|| AppError::BadRequest {
        message: format!("Unknown command: {}", req.text.trim()),
    })?;
    info!(command = ?command, "command received");

    let text = match command {
        Command::Report(mode) => format_report(&state.pipeline.build_report(mode).await),
        Command::Status => {
            let now = Utc::now().with_timezone(&state.pipeline.timezone());
            status_text(now, state.cache.entry_count())
        }
        Command::Refresh => {
            let cleared = state.cache.invalidate_all().await;
            info!(cleared, "payload cache cleared");
            refresh_text(cleared)
        }
        Command::Help => help_text(),
        Command::Start => start_text(),
    };

    Ok(Json(CommandResponse {
        messages: split_message(&text, state.message_limit),
    }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(status = %status, "{message}");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
