//! Conversation transcript endpoints.
//!
//! The agent runtime records each conversation through these routes; the
//! server proxies them to the durable store so the agent never holds
//! store credentials itself.

use crate::{store_error_response, AppState};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use handoff_types::ConversationMessage;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionBody {
    /// Caller-chosen id (e.g. the telephony room name); generated when
    /// absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST /api/sessions` — starts a persisted conversation transcript.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Option<Json<CreateSessionBody>>,
) -> Response {
    let session_id = body
        .and_then(|Json(b)| b.session_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match state.store.create_session(&session_id, Utc::now()).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "session_id": session_id })),
        )
            .into_response(),
        Err(e) => store_error_response("create session", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AppendMessageBody {
    pub role: String,
    pub content: String,
    /// Turn time; defaults to the server clock.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `POST /api/sessions/{sessionId}/messages` — appends one turn.
pub async fn append_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<AppendMessageBody>,
) -> Response {
    let message = ConversationMessage {
        role: body.role,
        content: body.content,
        timestamp: body.timestamp.unwrap_or_else(Utc::now),
    };

    match state.store.append_message(&session_id, message).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response("append message", e),
    }
}

/// `POST /api/sessions/{sessionId}/end` — stamps the transcript's end.
pub async fn end_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.end_session(&session_id, Utc::now()).await {
        Ok(()) => Json(json!({ "session_id": session_id })).into_response(),
        Err(e) => store_error_response("end session", e),
    }
}

/// `GET /api/sessions/{sessionId}` — reads a transcript back.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.get_session(&session_id).await {
        Ok(Some(session)) => Json(session).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("not found: {}", session_id) })),
        )
            .into_response(),
        Err(e) => store_error_response("get session", e),
    }
}
