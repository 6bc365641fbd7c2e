//! Tool server command

use super::open_service;
use anyhow::Result;
use std::sync::Arc;
use taike_core::config::AppConfig;
use tracing::info;

/// Serve the tool registry over HTTP until interrupted
pub async fn serve_command(config: AppConfig, bind: Option<String>) -> Result<()> {
    let mut mcp = config.mcp.clone();
    if let Some(bind) = bind {
        mcp.bind_address = bind;
    }

    let service = open_service(config)?;
    let registry = Arc::new(service.registry());
    info!("Serving tools: {}", registry.list_tools().join(", "));

    taike_core::mcp::serve(&mcp, registry).await?;
    Ok(())
}
