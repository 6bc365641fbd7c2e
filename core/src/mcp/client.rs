//! Client session over the streamable HTTP transport

use super::protocol::{
    event_stream_data, CallToolResult, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
    SESSION_HEADER,
};
use crate::error::{McpError, Result};
use crate::tools::ToolDefinition;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

/// One initialized protocol session
pub struct McpSession {
    client: Client,
    url: Url,
    session_id: Option<String>,
    next_id: u64,
}

impl McpSession {
    /// Initialize a session: `initialize` followed by `notifications/initialized`
    pub async fn open(client: Client, url: Url) -> Result<Self> {
        let mut session = Self {
            client,
            url,
            session_id: None,
            next_id: 0,
        };

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "taike",
                "version": crate::VERSION
            }
        });
        let result = session.request("initialize", params).await?;
        debug!(
            "MCP session initialized: server={}, session_id={:?}",
            result["serverInfo"]["name"], session.session_id
        );

        session
            .send(&JsonRpcRequest::notification("notifications/initialized"))
            .await?;
        Ok(session)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// List the server's tools
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDefinition>> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(tools)?)
    }

    /// Call one tool
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        let result = self
            .request(
                "tools/call",
                json!({ "name": name, "arguments": Value::Object(arguments) }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Terminate the session. Only sessions with a server-issued id need it.
    pub async fn close(self) -> Result<()> {
        if let Some(session_id) = &self.session_id {
            let response = self
                .client
                .delete(self.url.clone())
                .header(SESSION_HEADER, session_id)
                .send()
                .await?;
            debug!("MCP session closed: {}", response.status());
        }
        Ok(())
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        self.next_id += 1;
        let message = JsonRpcRequest::new(self.next_id, method, params);
        let response = self.send(&message).await?.ok_or_else(|| McpError::Protocol {
            message: format!("no response to {}", method),
        })?;
        response.into_result()
    }

    /// POST one message; notifications yield `None`
    async fn send(&mut self, message: &JsonRpcRequest) -> Result<Option<JsonRpcResponse>> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(session_id) = &self.session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        let response = builder.send().await?;
        let status = response.status();

        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        if message.is_notification() || status == StatusCode::ACCEPTED {
            return Ok(None);
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);
        let body = response.text().await?;

        if is_event_stream {
            // skip server-initiated messages until our response shows up
            for data in event_stream_data(&body) {
                if let Ok(parsed) = serde_json::from_str::<JsonRpcResponse>(&data) {
                    if parsed.id == message.id.clone().unwrap_or(Value::Null) {
                        return Ok(Some(parsed));
                    }
                }
            }
            return Err(McpError::Protocol {
                message: format!("no response for {} in event stream", message.method),
            }
            .into());
        }

        Ok(Some(serde_json::from_str(&body)?))
    }
}
