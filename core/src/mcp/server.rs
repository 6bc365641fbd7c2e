//! Tool server speaking the streamable HTTP protocol over axum

use super::protocol::{
    CallToolResult, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, SERVER_NAME,
};
use crate::config::McpConfig;
use crate::error::Result;
use crate::tools::ToolRegistry;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// State shared by the request handlers
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<ToolRegistry>,
    pub allowed_hosts: Arc<Vec<String>>,
}

impl ServerState {
    pub fn new(registry: Arc<ToolRegistry>, allowed_hosts: Vec<String>) -> Self {
        Self {
            registry,
            allowed_hosts: Arc::new(allowed_hosts),
        }
    }
}

/// Router serving `/mcp`
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .layer(middleware::from_fn_with_state(state.clone(), check_host))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &McpConfig, registry: Arc<ToolRegistry>) -> Result<()> {
    let state = ServerState::new(registry, config.allowed_hosts.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("MCP tool server listening on http://{}/mcp", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Whether `host` (with optional port) matches one allowlist entry.
/// `name:*` accepts any port, anything else must match exactly.
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let host = host.to_ascii_lowercase();
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        match pattern.strip_suffix(":*") {
            Some(name) => {
                host == name
                    || host
                        .strip_prefix(name)
                        .and_then(|rest| rest.strip_prefix(':'))
                        .map(|port| port.chars().all(|c| c.is_ascii_digit()))
                        .unwrap_or(false)
            }
            None => host == pattern,
        }
    })
}

fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

async fn check_host(State(state): State<ServerState>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !host_allowed(host, &state.allowed_hosts) {
        warn!("Rejected request with Host header {:?}", host);
        return (StatusCode::FORBIDDEN, "Invalid Host header").into_response();
    }

    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        let accepted = origin_authority(origin)
            .map(|authority| host_allowed(&authority, &state.allowed_hosts))
            .unwrap_or(false);
        if !accepted {
            warn!("Rejected request with Origin header {:?}", origin);
            return (StatusCode::FORBIDDEN, "Invalid Origin header").into_response();
        }
    }

    next.run(request).await
}

async fn handle_delete() -> StatusCode {
    // sessions are not tracked, nothing to release
    StatusCode::OK
}

async fn handle_post(
    State(state): State<ServerState>,
    body: Bytes,
) -> Response {
    let message: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!("Unparseable request body: {}", e);
            let response = JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error");
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    if message.jsonrpc != JSONRPC_VERSION {
        let response = JsonRpcResponse::failure(
            message.id.unwrap_or(Value::Null),
            INVALID_REQUEST,
            "Invalid Request",
        );
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }

    let Some(id) = message.id.clone() else {
        debug!("Notification: {}", message.method);
        return StatusCode::ACCEPTED.into_response();
    };

    let response = dispatch(&state, id, &message.method, message.params).await;
    Json(response).into_response()
}

async fn dispatch(
    state: &ServerState,
    id: Value,
    method: &str,
    params: Option<Value>,
) -> JsonRpcResponse {
    match method {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {"name": SERVER_NAME, "version": crate::VERSION}
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(
            id,
            json!({ "tools": state.registry.definitions() }),
        ),
        "tools/call" => {
            let params = params.unwrap_or(Value::Null);
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing tool name");
            };
            let arguments = match params.get("arguments") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(arguments)) => arguments.clone(),
                Some(_) => {
                    return JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        "Tool arguments must be an object",
                    )
                }
            };

            info!("tools/call {}", name);
            let (text, is_error) = state.registry.invoke(name, arguments).await;
            match serde_json::to_value(CallToolResult::text(text, is_error)) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
            }
        }
        other => {
            debug!("Unknown method: {}", other);
            JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "Method not found")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{HttpMcpTransport, ToolTransport};
    use crate::tools::test_support::context;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_host_patterns() {
        let allowed = patterns(&["localhost:*", "127.0.0.1:*", "tools.internal"]);
        assert!(host_allowed("localhost", &allowed));
        assert!(host_allowed("localhost:8000", &allowed));
        assert!(host_allowed("127.0.0.1:1234", &allowed));
        assert!(host_allowed("tools.internal", &allowed));
        assert!(!host_allowed("tools.internal:80", &allowed));
        assert!(!host_allowed("localhost.evil.com", &allowed));
        assert!(!host_allowed("evil.com:8000", &allowed));
        assert!(host_allowed("anything", &[]));
    }

    #[test]
    fn test_origin_authority() {
        assert_eq!(
            origin_authority("http://localhost:3000").as_deref(),
            Some("localhost:3000")
        );
        assert_eq!(origin_authority("null"), None);
    }

    async fn spawn_server(allowed_hosts: Vec<String>) -> SocketAddr {
        let registry = Arc::new(ToolRegistry::with_context(&context(&[
            ("강남구", 2025, 1200.0),
            ("강남구", 2026, 1210.5),
        ])));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(ServerState::new(registry, allowed_hosts));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn transport(addr: SocketAddr) -> HttpMcpTransport {
        HttpMcpTransport::new(&format!("http://{}/mcp", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_tool_call() {
        let addr = spawn_server(McpConfig::default().allowed_hosts).await;
        let transport = transport(addr);

        let arguments = json!({"district": "강남구", "start_year": 2025, "end_year": 2026});
        let text = transport
            .call_tool("db_forecast_search", arguments.as_object().unwrap().clone())
            .await
            .unwrap();
        assert!(text.contains("1200"));
        assert!(text.contains("1210.5"));

        let tools = transport.list_tools().await.unwrap();
        assert_eq!(tools.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_text() {
        let addr = spawn_server(Vec::new()).await;
        let text = transport(addr).call_tool("bash", Map::new()).await.unwrap();
        assert!(text.contains("Tool not found: bash"));
    }

    #[tokio::test]
    async fn test_disallowed_host_is_forbidden() {
        let addr = spawn_server(patterns(&["tools.internal:*"])).await;
        let err = transport(addr)
            .call_tool("rag_search", Map::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_raw_protocol_errors() {
        let addr = spawn_server(Vec::new()).await;
        let url = format!("http://{}/mcp", addr);
        let client = reqwest::Client::new();

        let response = client.post(&url).body("{not json").send().await.unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], PARSE_ERROR);

        let response = client
            .post(&url)
            .json(&json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"}))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["id"], 7);
        assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);

        let response = client
            .post(&url)
            .json(&json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call", "params": {}}))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], INVALID_PARAMS);

        let response = client
            .post(&url)
            .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 202);
    }
}
