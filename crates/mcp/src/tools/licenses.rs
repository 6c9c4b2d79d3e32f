// License check tool: relays a dependency manifest to the analysis backend

use crate::protocol::{CallToolResult, ToolContent, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::Result;
use licenseguard_backend::{AnalysisRequest, BackendError, LicenseBackend};
use licenseguard_core::{parse_requirements, ParseWarning, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const MAX_PROJECT_NAME_CHARS: usize = 100;

/// `check_licenses`: parse a requirements file and return the backend's license report
pub struct CheckLicensesTool {
    backend: Arc<dyn LicenseBackend>,
}

impl CheckLicensesTool {
    pub fn new(backend: Arc<dyn LicenseBackend>) -> Self {
        Self { backend }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CheckLicensesArgs {
    #[serde(default, alias = "requirements_content")]
    requirements_text: Option<String>,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    user_token: Option<String>,
}

/// Error payload returned to the peer as `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn into_result(self) -> CallToolResult {
        CallToolResult::structured_error(serde_json::json!({ "error": self }))
    }
}

impl From<&ValidationError> for ToolError {
    fn from(err: &ValidationError) -> Self {
        Self::new(err.code(), err.describe())
    }
}

impl From<&BackendError> for ToolError {
    fn from(err: &BackendError) -> Self {
        let message = match err {
            BackendError::Timeout { after } => format!(
                "The analysis timed out after {:?} waiting for the license backend. Please try again.",
                after
            ),
            BackendError::Unreachable(reason) => format!(
                "Could not connect to the license analysis backend ({}). Check that the service is running, then retry.",
                reason
            ),
            BackendError::RejectedRequest { status: status @ (401 | 403), .. } => format!(
                "Authorization failed (HTTP {}): {}. The user token is invalid or expired; ask the user for a new token.",
                status,
                err.detail().unwrap_or_else(|| "no details provided".to_string())
            ),
            BackendError::RejectedRequest { status, .. } => format!(
                "The license analysis backend rejected the request (HTTP {}): {}",
                status,
                err.detail().unwrap_or_else(|| "no details provided".to_string())
            ),
            BackendError::InvalidResponse(reason) => format!(
                "The license analysis backend returned an unexpected response: {}",
                reason
            ),
            BackendError::InvalidRequest(reason) => format!(
                "The request to the license analysis backend could not be built: {}",
                reason
            ),
            BackendError::ClientSetup(reason) => format!("Internal error: {}", reason),
        };

        Self {
            code: err.code().to_string(),
            message,
            status: err.status(),
        }
    }
}

fn parse_args(arguments: serde_json::Value) -> Result<CheckLicensesArgs, ValidationError> {
    if arguments.is_null() {
        return Ok(CheckLicensesArgs::default());
    }
    serde_json::from_value(arguments).map_err(|e| ValidationError::InvalidArguments(e.to_string()))
}

fn prepare(args: CheckLicensesArgs) -> Result<(AnalysisRequest, Vec<ParseWarning>), ValidationError> {
    let text = args.requirements_text.unwrap_or_default();
    let parsed = parse_requirements(&text)?;

    let mut request = AnalysisRequest::new(parsed.dependencies);

    if let Some(name) = args.project_name {
        let length = name.trim().chars().count();
        if length == 0 || length > MAX_PROJECT_NAME_CHARS {
            return Err(ValidationError::InvalidProjectName {
                length,
                max: MAX_PROJECT_NAME_CHARS,
            });
        }
        request = request.with_project_name(name);
    }

    if let Some(token) = args.user_token {
        if token.is_empty() {
            return Err(ValidationError::InvalidToken("must not be empty"));
        }
        // Travels in an HTTP header
        if !token.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError::InvalidToken(
                "must contain only printable ASCII characters",
            ));
        }
        request = request.with_bearer_token(token);
    }

    Ok((request, parsed.warnings))
}

fn format_warnings(warnings: &[ParseWarning]) -> String {
    let mut text = format!("Skipped {} manifest line(s):", warnings.len());
    for warning in warnings {
        text.push_str("\n- ");
        text.push_str(&warning.to_string());
    }
    text
}

#[async_trait::async_trait]
impl Tool for CheckLicensesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "check_licenses".to_string(),
            description: "Analyze a Python requirements.txt manifest and return the detected \
                          license and a confidence score for every dependency."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "requirements_text": json_schema_string("Raw contents of the requirements file, one dependency per line"),
                    "project_name": json_schema_string("Optional project name (1-100 characters)"),
                    "user_token": json_schema_string("Optional bearer token forwarded to the analysis backend")
                }),
                vec!["requirements_text"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let (request, warnings) = match parse_args(arguments).and_then(prepare) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "Rejected check_licenses input");
                return Ok(ToolError::from(&e).into_result());
            }
        };

        info!(
            dependencies = request.dependencies.len(),
            skipped_lines = warnings.len(),
            project = request.project_name.as_deref().unwrap_or("-"),
            "Submitting dependencies for license analysis"
        );

        match self.backend.submit_dependencies(&request).await {
            Ok(report) => {
                let mut result = CallToolResult::structured(serde_json::to_value(&report)?);
                if !warnings.is_empty() {
                    result.content.push(ToolContent::text(format_warnings(&warnings)));
                }
                Ok(result)
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "License analysis failed");
                Ok(ToolError::from(&e).into_result())
            }
        }
    }
}
