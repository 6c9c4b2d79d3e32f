//! Error types for the backend client.

use std::time::Duration;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Longest backend detail carried into an error message.
const MAX_DETAIL_CHARS: usize = 500;

/// Failures talking to the license analysis backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No response within the configured timeout.
    #[error("backend request timed out after {after:?}")]
    Timeout { after: Duration },

    /// Connection refused, DNS failure or another transport problem.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with a non-2xx status.
    #[error("backend rejected the request (status {status})")]
    RejectedRequest { status: u16, body: String },

    /// 2xx response whose body is not a report.
    #[error("backend returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The outbound request could not be built.
    #[error("invalid backend request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    ClientSetup(String),
}

impl BackendError {
    /// Stable error code reported to MCP peers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "BACKEND_TIMEOUT",
            Self::Unreachable(_) => "BACKEND_UNREACHABLE",
            Self::RejectedRequest { status: 401 | 403, .. } => "BACKEND_UNAUTHORIZED",
            Self::RejectedRequest { .. } => "BACKEND_REJECTED",
            Self::InvalidResponse(_) => "BACKEND_INVALID_RESPONSE",
            Self::InvalidRequest(_) => "BACKEND_INVALID_REQUEST",
            Self::ClientSetup(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status returned by the backend, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RejectedRequest { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable reason extracted from a rejected response body.
    ///
    /// Looks for a JSON `detail`, `error` or `message` field, falling back to
    /// the raw body text.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::RejectedRequest { body, .. } => extract_detail(body),
            _ => None,
        }
    }

    /// Map a reqwest failure that happened before a response arrived.
    pub(crate) fn from_send(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: timeout }
        } else if err.is_builder() {
            Self::InvalidRequest(error_chain(&err))
        } else {
            Self::Unreachable(error_chain(&err))
        }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        for key in ["detail", "error", "message"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) => return Some(truncate(s)),
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(serde_json::Value::String(s)) = inner.get("message") {
                        return Some(truncate(s));
                    }
                    return Some(truncate(&serde_json::Value::Object(inner.clone()).to_string()));
                }
                Some(serde_json::Value::Null) | None => continue,
                Some(other) => return Some(truncate(&other.to_string())),
            }
        }
    }

    Some(truncate(trimmed))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

/// Render an error with its source chain, e.g. "error sending request: connection refused".
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
