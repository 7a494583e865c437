//! Handoff server library logic.

pub mod api_escalations;
pub mod api_sessions;
pub mod api_ws;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use handoff_broker::EscalationBroker;
use handoff_store::{HelpDeskStore, StoreError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The escalation broker, including its supervisor registry.
    pub broker: Arc<EscalationBroker>,
    /// The durable help-desk store (help requests, transcripts).
    pub store: Arc<dyn HelpDeskStore>,
}

/// Maximum request body size (256 KiB). Escalations and transcript turns
/// are short; anything larger is abuse.
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Maps a store failure to an HTTP response, logging it. Only the
/// transcript/help-request CRUD surface propagates store errors; the
/// broker's own status writes stay fire-and-forget.
pub(crate) fn store_error_response(context: &str, e: StoreError) -> Response {
    match e {
        StoreError::MissingRecord(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("not found: {}", id) })),
        )
            .into_response(),
        other => {
            tracing::error!("{} failed: {}", context, other);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "help desk store unavailable" })),
            )
                .into_response()
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/escalations",
            post(api_escalations::submit_escalation_handler),
        )
        .route(
            "/api/help-requests",
            post(api_escalations::create_help_request_handler),
        )
        .route(
            "/api/help-requests/{requestId}",
            get(api_escalations::get_help_request_handler),
        )
        .route("/api/sessions", post(api_sessions::create_session_handler))
        .route(
            "/api/sessions/{sessionId}",
            get(api_sessions::get_session_handler),
        )
        .route(
            "/api/sessions/{sessionId}/messages",
            post(api_sessions::append_message_handler),
        )
        .route(
            "/api/sessions/{sessionId}/end",
            post(api_sessions::end_session_handler),
        )
        .route("/ws", get(api_ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
