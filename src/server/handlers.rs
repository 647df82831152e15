//! Request handlers for `/api/chat`, `/api/clear` and `/api/health`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{error, warn};

use super::AppState;
use super::error::ApiError;
use crate::error::ErrorKind;
use crate::store::new_session_id;
use crate::types::{ChatReply, ChatRequest, ClearReply, ClearRequest, HealthReply};

/// Status line reported by the health check.
pub const HEALTH_MESSAGE: &str = "Chat relay server is running";

/// Runs one turn.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected chat request");
        ApiError::from(rejection)
    })?;
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_session_id);

    match state
        .conversation
        .run_turn(&session_id, &request.message)
        .await
    {
        Ok(message) => Ok(Json(ChatReply {
            message,
            session_id,
        })),
        Err(err) => {
            if err.kind() != ErrorKind::InvalidInput {
                error!(session_id = %session_id, error = %err, "chat turn failed");
            }
            Err(ApiError::from(err))
        }
    }
}

/// Forgets a session.  Unknown or missing session ids and unreadable bodies still succeed.
pub async fn clear_handler(
    State(state): State<AppState>,
    payload: Result<Json<ClearRequest>, JsonRejection>,
) -> Json<ClearReply> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "clear request without a usable body");
            ClearRequest::default()
        }
    };
    if let Some(session_id) = request.session_id.filter(|id| !id.is_empty()) {
        state.conversation.clear_session(&session_id).await;
    }
    Json(ClearReply { success: true })
}

/// Liveness check.
pub async fn health_handler() -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok".to_string(),
        message: HEALTH_MESSAGE.to_string(),
    })
}
