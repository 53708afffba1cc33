/// MCP Server Entry Point
///
/// Loads `.env`, sets up logging, reads configuration from the environment
/// (see `core::config`), builds the tool registry and starts the selected
/// transports.

use std::sync::Arc;

use arithmetic_mcp::core::config::{ServerConfig, TransportMode};
use arithmetic_mcp::core::{logging, server};
use arithmetic_mcp::tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read before logging starts so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();

    logging::init_tracing().map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    let config = ServerConfig::from_env()?;
    let registry = Arc::new(tools::initialize_tools(config.duplicate_policy)?);

    match config.transport {
        TransportMode::Stdio => server::run_server_stdio(config.server_info(), registry).await?,
        TransportMode::Http => server::run_server_http(&config, registry).await?,
        TransportMode::Both => {
            let stdio_registry = Arc::clone(&registry);
            let info = config.server_info();

            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(info, stdio_registry).await {
                    tracing::error!(error = %e, "STDIO server error");
                }
            });

            let http_result = server::run_server_http(&config, registry).await;

            // HTTP exited; STDIO goes with it.
            stdio_handle.abort();
            http_result?;
        }
    }

    Ok(())
}
