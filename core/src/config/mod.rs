//! Minimal configuration module for tAIke core
//!
//! Only exports pure data types. All loading logic is in CLI layer.

pub mod types;

pub use types::{
    seconds_to_duration, AgentSettings, AppConfig, DataConfig, GenerationConfig, McpConfig, RetryPolicy,
    DEFAULT_MCP_URL, LOCAL_TOOLS,
};
