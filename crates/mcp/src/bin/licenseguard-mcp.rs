// Standalone MCP server binary speaking JSON-RPC over stdin/stdout

use anyhow::{Context, Result};
use licenseguard_core::{BackendConfig, BackendSettings};
use licenseguard_mcp::{stdio, McpServer};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "licenseguard=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("LicenseGuard MCP server starting...");

    let config = BackendConfig::from_env(&BackendSettings::default())
        .context("Invalid backend configuration")?;
    tracing::info!(
        backend = %config.analyze_url(),
        timeout_secs = config.timeout().as_secs(),
        "Backend configured"
    );

    let server = McpServer::for_backend(Arc::new(config))?;
    tracing::info!("Registered {} tools", server.registry().len());

    stdio::serve_stdio(Arc::new(server)).await
}
