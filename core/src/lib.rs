//! # tAIke Core
//!
//! Core library for tAIke, a child-welfare analytics assistant for Seoul's
//! district child centers.
//!
//! This library provides the tool-calling agent loop and its action parser,
//! the tool server and client that speak JSON-RPC over HTTP, forecast storage
//! and bounding, and guideline retrieval.

// Core modules
pub mod agent;
pub mod config;
pub mod error;
pub mod forecast;
pub mod llm;
pub mod mcp;
pub mod rag;
pub mod service;
pub mod tools;

// Re-export commonly used types
pub use agent::{AgentConfig, AgentOutcome, ToolAgent, ToolAgentBuilder};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use mcp::ToolClient;
pub use service::{GenAiService, Report};

/// Current version of the taike-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
