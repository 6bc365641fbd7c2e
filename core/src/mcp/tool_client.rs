//! Tool client used by the agent loop

use super::transport::{HttpMcpTransport, LocalTransport, ToolTransport};
use crate::config::McpConfig;
use crate::error::{McpError, Result};
use crate::tools::ToolRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle};
use tracing::{debug, error};

/// Invokes named tools and always hands back text.
///
/// Transport failures never escape: they come back as an error sentence
/// the agent can show the model as an observation.
#[derive(Clone)]
pub struct ToolClient {
    transport: Arc<dyn ToolTransport>,
}

impl ToolClient {
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self { transport }
    }

    /// Client for a remote tool server
    pub fn http(config: &McpConfig) -> Result<Self> {
        let transport =
            HttpMcpTransport::new(&config.url, Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Client that runs tools in-process
    pub fn local(registry: Arc<ToolRegistry>) -> Self {
        Self::new(Arc::new(LocalTransport::new(registry)))
    }

    pub fn endpoint(&self) -> String {
        self.transport.endpoint()
    }

    pub async fn call_tool_async(&self, name: &str, arguments: Map<String, Value>) -> String {
        let shown = Value::Object(arguments.clone());
        debug!("Tool call: {} {}", name, shown);
        match self.transport.call_tool(name, arguments).await {
            Ok(text) => text,
            Err(e) => {
                error!("Tool call {} failed: {}", name, e);
                error_text(name, &e)
            }
        }
    }

    /// Blocking call for synchronous callers.
    ///
    /// Inside a runtime this must run on a blocking-capable thread
    /// (`spawn_blocking`); outside one a temporary runtime is built.
    pub fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> String {
        match Handle::try_current() {
            Ok(handle) => handle.block_on(self.call_tool_async(name, arguments)),
            Err(_) => match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(self.call_tool_async(name, arguments)),
                Err(e) => {
                    let e = McpError::Runtime {
                        message: e.to_string(),
                    };
                    error_text(name, &e.into())
                }
            },
        }
    }
}

fn error_text(name: &str, e: &crate::error::Error) -> String {
    format!("MCP 도구 호출 오류 ({}): {}", name, e)
}
