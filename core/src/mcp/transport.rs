//! Transports the tool client can call tools through

use super::client::McpSession;
use crate::error::{ConfigError, Result};
use crate::tools::{ToolDefinition, ToolRegistry};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Something that can run a named tool and hand back its text result
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String>;

    /// Human-readable description of where tools run
    fn endpoint(&self) -> String;
}

/// Calls a remote tool server, one session per call
pub struct HttpMcpTransport {
    url: Url,
    timeout: Duration,
}

impl HttpMcpTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidValue {
            field: "mcp.url".to_string(),
            value: format!("{} ({})", url, e),
        })?;
        Ok(Self { url, timeout })
    }

    // No connection pooling: a pooled connection may belong to a runtime
    // that no longer exists by the next call.
    fn http_client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .build()?)
    }

    async fn open(&self) -> Result<McpSession> {
        McpSession::open(self.http_client()?, self.url.clone()).await
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let mut session = self.open().await?;
        let tools = session.list_tools().await;
        session.close().await?;
        tools
    }
}

#[async_trait]
impl ToolTransport for HttpMcpTransport {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        debug!("Calling remote tool {} at {}", name, self.url);
        let mut session = self.open().await?;
        let result = session.call_tool(name, arguments).await;
        if let Err(e) = session.close().await {
            debug!("Failed to close MCP session: {}", e);
        }
        Ok(result?.first_text())
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }
}

/// Runs tools in-process against a registry
pub struct LocalTransport {
    registry: Arc<ToolRegistry>,
}

impl LocalTransport {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolTransport for LocalTransport {
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        let (text, _is_error) = self.registry.invoke(name, arguments).await;
        Ok(text)
    }

    fn endpoint(&self) -> String {
        "local".to_string()
    }
}
