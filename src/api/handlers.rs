//! HTTP request handlers

use super::types::{ErrorResponse, WebhookMessage, WebhookResponse};
use super::AppState;
use crate::runtime::InboundMessage;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Inbound messages from the gateway
        .route("/webhook/messages", post(receive_message))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn receive_message(
    State(state): State<AppState>,
    Json(req): Json<WebhookMessage>,
) -> Result<Json<WebhookResponse>, AppError> {
    let from = req.from.trim();
    if from.is_empty() {
        return Err(AppError::BadRequest("Sender id is required".to_string()));
    }

    let replies = state
        .runtime
        .dispatch(InboundMessage {
            from: from.to_string(),
            body: req.body,
            location: req.location,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to dispatch inbound message");
            AppError::Unavailable(e.to_string())
        })?;

    tracing::debug!(from = %from, replies = replies.len(), "Message handled");
    Ok(Json(WebhookResponse { replies }))
}

async fn health() -> &'static str {
    "ok"
}

async fn get_version() -> &'static str {
    concat!("pedido-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
