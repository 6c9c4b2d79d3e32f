//! Backend client for the license analysis service.

use crate::error::BackendResult;
use crate::transport::HttpTransport;
use licenseguard_core::{BackendConfig, DependencyList, Report};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Body sent to the analysis endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub dependencies: DependencyList,
    /// Sent as `Authorization: Bearer`, never in the body
    #[serde(skip)]
    pub bearer_token: Option<String>,
}

impl AnalysisRequest {
    pub fn new(dependencies: DependencyList) -> Self {
        Self {
            project_name: None,
            dependencies,
            bearer_token: None,
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// Anything that can turn a dependency list into a report
#[async_trait::async_trait]
pub trait LicenseBackend: Send + Sync {
    async fn submit_dependencies(&self, request: &AnalysisRequest) -> BackendResult<Report>;
}

/// HTTP client for the REST backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    config: Arc<BackendConfig>,
    http: HttpTransport,
}

impl BackendClient {
    pub fn new(config: Arc<BackendConfig>) -> BackendResult<Self> {
        let http = HttpTransport::new(config.timeout())?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl LicenseBackend for BackendClient {
    async fn submit_dependencies(&self, request: &AnalysisRequest) -> BackendResult<Report> {
        let started = Instant::now();
        let submitted = request.dependencies.len();

        let report: Report = self
            .http
            .post_json(
                self.config.analyze_url(),
                request,
                request.bearer_token.as_deref(),
            )
            .await?;

        if report.len() != submitted {
            warn!(
                submitted,
                findings = report.len(),
                "Backend returned a different number of findings than dependencies submitted"
            );
        }

        info!(
            findings = report.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend analysis completed"
        );

        Ok(report)
    }
}
