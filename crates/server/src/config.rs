use anyhow::{Context, Result};
use licenseguard_core::{BackendConfig, BackendSettings};
use licenseguard_mcp::McpServer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub backend: BackendSettings,
}

impl ServerConfig {
    /// Load the config file if it exists, otherwise use defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", config_path.display()))
    }

    /// Resolve the backend location from the environment on top of the file settings
    pub fn backend(&self) -> Result<BackendConfig> {
        BackendConfig::from_env(&self.backend).context("Invalid backend configuration")
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub mcp: Arc<McpServer>,
}

impl AppState {
    pub fn new(backend: BackendConfig) -> Result<Self> {
        let mcp = McpServer::for_backend(Arc::new(backend))?;
        tracing::info!("Registered {} tools", mcp.registry().len());
        Ok(Self { mcp: Arc::new(mcp) })
    }
}
