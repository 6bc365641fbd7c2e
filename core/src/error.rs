//! Error types and handling for tAIke Core

use thiserror::Error;

/// Result type alias for tAIke operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tAIke Core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generation endpoint errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Agent execution errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// MCP transport errors
    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    /// Forecast data errors
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

/// Generation endpoint errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation endpoint is not configured")]
    NotConfigured,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

/// Tool execution errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Invalid tool parameters: {message}")]
    InvalidParameters { message: String },
}

/// Agent execution errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Maximum iterations must be at least 1")]
    NoIterations,

    #[error("Report generation failed: {message}")]
    ReportFailed { message: String },
}

/// MCP transport errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed server message: {message}")]
    Protocol { message: String },

    #[error("Failed to start tool runtime: {message}")]
    Runtime { message: String },
}

/// Forecast data errors
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("No history for district: {district}")]
    NoHistory { district: String },

    #[error("Invalid forecast input: {message}")]
    InvalidInput { message: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}
