//! Tool protocol plumbing: JSON-RPC messages, client session, server and
//! the tool client the agent loop calls through.

pub mod client;
pub mod protocol;
pub mod server;
pub mod tool_client;
pub mod transport;

pub use client::McpSession;
pub use protocol::{CallToolResult, ContentItem, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::{router, serve, ServerState};
pub use tool_client::ToolClient;
pub use transport::{HttpMcpTransport, LocalTransport, ToolTransport};
