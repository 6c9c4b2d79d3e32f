use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use licenseguard_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use serde_json::Value;
use std::sync::Arc;

pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// MCP Streamable HTTP endpoint (JSON responses only)
pub async fn mcp(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting malformed MCP payload");
            let response = JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error());
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let initializing = contains_initialize(&message);

    match state.mcp.handle_value(message).await {
        // Only notifications or responses
        None => StatusCode::ACCEPTED.into_response(),
        Some(reply) => {
            let mut response = Json(reply).into_response();
            if initializing {
                let session_id = uuid::Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&session_id) {
                    tracing::debug!(session_id = %session_id, "Issued MCP session id");
                    response.headers_mut().insert(SESSION_ID_HEADER, value);
                }
            }
            response
        }
    }
}

/// No server-initiated stream is offered and sessions need no teardown
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
    )
}

fn contains_initialize(message: &Value) -> bool {
    let is_initialize = |m: &Value| m.get("method").and_then(Value::as_str) == Some("initialize");
    match message {
        Value::Array(batch) => batch.iter().any(is_initialize),
        single => is_initialize(single),
    }
}
