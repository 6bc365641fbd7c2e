//! Tools listing command

use super::open_service;
use crate::output::print_tools;
use anyhow::Result;
use std::time::Duration;
use taike_core::config::AppConfig;
use taike_core::mcp::HttpMcpTransport;
use tracing::info;

/// Show available tools, locally registered or from the tool server
pub async fn tools_command(config: AppConfig, remote: bool) -> Result<()> {
    let definitions = if remote {
        info!("Listing tools at {}", config.mcp.url);
        let transport =
            HttpMcpTransport::new(&config.mcp.url, Duration::from_secs(config.mcp.timeout_secs))?;
        transport.list_tools().await?
    } else {
        info!("Listing available tools");
        open_service(config)?.registry().definitions()
    };

    print_tools(&definitions);
    Ok(())
}
