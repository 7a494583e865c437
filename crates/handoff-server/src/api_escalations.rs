//! Agent-facing escalation and help-request endpoints.

use crate::{store_error_response, AppState};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use handoff_broker::{BrokerError, SubmitOutcome, SubmitQuery, NO_RESPONSE_ANSWER};
use handoff_types::HelpRequest;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// `POST /api/escalations` — called by the agent when it needs a human.
///
/// Blocks the agent's turn until a supervisor answers or the broker's
/// reply deadline elapses. Extra body fields beyond `question` and
/// `request_id` pass through into the broadcast envelope.
pub async fn submit_escalation_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(query): Json<SubmitQuery>,
) -> Response {
    let request_id = query.request_id.clone();
    match state.broker.submit(query).await {
        Ok(SubmitOutcome::Answered {
            response,
            request_id,
        }) => (
            StatusCode::OK,
            Json(json!({ "response": response, "request_id": request_id })),
        )
            .into_response(),
        Ok(SubmitOutcome::TimedOut) => {
            (StatusCode::OK, Json(json!({ "answer": NO_RESPONSE_ANSWER }))).into_response()
        }
        Err(BrokerError::NoSupervisorConnected) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "no supervisor connected" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id, "escalation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateHelpRequestBody {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST /api/help-requests` — creates the durable record the agent
/// escalates against, in `PENDING` status.
pub async fn create_help_request_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CreateHelpRequestBody>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let record = HelpRequest::new(request_id.clone(), body.session_id, body.question, Utc::now());

    match state.store.create_help_request(&record).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "request_id": request_id })),
        )
            .into_response(),
        Err(e) => store_error_response("create help request", e),
    }
}

/// `GET /api/help-requests/{requestId}` — reads a record back, mainly
/// for the supervisor console.
pub async fn get_help_request_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Response {
    match state.store.get_help_request(&request_id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("not found: {}", request_id) })),
        )
            .into_response(),
        Err(e) => store_error_response("get help request", e),
    }
}
