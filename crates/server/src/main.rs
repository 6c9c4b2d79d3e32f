use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod shutdown;

use config::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "licenseguard")]
#[command(about = "LicenseGuard - MCP gateway for dependency license checks", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "licenseguard.toml")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "MCP_PORT", default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "MCP_HOST", default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "licenseguard=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting LicenseGuard MCP gateway");

    // Configuration problems stop us before anything is bound
    let config = ServerConfig::load(&args.config)?;
    let backend = config.backend()?;
    tracing::info!(
        backend = %backend.analyze_url(),
        timeout_secs = backend.timeout().as_secs(),
        "Backend configured"
    );

    let state = AppState::new(backend)?;

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting API server on {}", addr);

    api::serve(&addr, state, shutdown::shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}
