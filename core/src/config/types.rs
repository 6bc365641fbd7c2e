//! Configuration types for tAIke core
//!
//! Core only accepts fully resolved, validated configuration.
//! All discovery, loading, and merging happens in CLI layer.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default tool server endpoint
pub const DEFAULT_MCP_URL: &str = "http://127.0.0.1:8000/mcp";

/// `mcp.url` value that runs tools in-process instead of over HTTP
pub const LOCAL_TOOLS: &str = "local";

/// Retry policy for the generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first request
    pub max_retries: u32,
    /// Base backoff in seconds, doubled on every further retry
    pub backoff_factor_secs: f64,
    /// Status codes that trigger a retry
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_factor_secs: 0.6,
            status_forcelist: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Whether a response with this status should be retried
    pub fn should_retry(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Sleep before the given retry (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16) as i32;
        let secs = self.backoff_factor_secs * 2f64.powi(exp);
        if secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Settings for the text-generation server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Full URL of the `/generate` endpoint
    pub endpoint: Option<String>,
    /// Model version requested from the server
    pub model_version: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum number of generated tokens
    pub max_new_tokens: u32,
    /// Connect timeout in seconds
    pub connect_timeout_secs: f64,
    /// Read timeout in seconds
    pub read_timeout_secs: f64,
    /// Retry behaviour for transient failures
    pub retry: RetryPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model_version: "final".to_string(),
            temperature: 0.3,
            max_new_tokens: 512,
            connect_timeout_secs: 10.0,
            read_timeout_secs: 180.0,
            retry: RetryPolicy::default(),
        }
    }
}

/// Settings for the MCP tool server and client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// URL the tool client connects to
    pub url: String,
    /// Per-request timeout for the tool client, in seconds
    pub timeout_secs: u64,
    /// Address the tool server binds to
    pub bind_address: String,
    /// Host header patterns accepted by the tool server (`host:*` matches any port)
    pub allowed_hosts: Vec<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MCP_URL.to_string(),
            timeout_secs: 300,
            bind_address: "127.0.0.1:8000".to_string(),
            allowed_hosts: vec![
                "localhost:*".to_string(),
                "127.0.0.1:*".to_string(),
                "host.docker.internal:*".to_string(),
            ],
        }
    }
}

/// Settings for the tool-calling agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of LLM calls per run
    pub max_iterations: usize,
    /// Number of recent history entries included in the prompt
    pub history_window: usize,
    /// Number of finalized question/answer pairs kept between runs
    pub memory_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            history_window: 4,
            memory_capacity: 5,
        }
    }
}

/// Locations of the data collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// SQLite database holding history and forecasts
    pub database_path: String,
    /// JSONL file with guideline passages for retrieval
    pub rag_documents_path: String,
    /// Number of passages returned per lookup
    pub rag_top_k: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            database_path: "data/taike.db".to_string(),
            rag_documents_path: "data/jsonl/rag_data.jsonl".to_string(),
            rag_top_k: 3,
        }
    }
}

impl DataConfig {
    /// Database path with `~` and environment variables expanded
    pub fn expanded_database_path(&self) -> String {
        expand(&self.database_path)
    }

    /// Retrieval document path with `~` and environment variables expanded
    pub fn expanded_rag_path(&self) -> String {
        expand(&self.rag_documents_path)
    }
}

/// Seconds as a [`Duration`]; negative, NaN, infinite or out-of-range values are rejected
pub fn seconds_to_duration(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: secs.to_string(),
        }
        .into()
    })
}

fn expand(path: &str) -> String {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Fully resolved application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub mcp: McpConfig,
    pub agent: AgentSettings,
    pub data: DataConfig,
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.generation.endpoint {
            validate_http_url("generation.endpoint", endpoint)?;
        }
        if self.mcp.url != LOCAL_TOOLS {
            validate_http_url("mcp.url", &self.mcp.url)?;
        }

        let temp = self.generation.temperature;
        if !(0.0..=2.0).contains(&temp) {
            return Err(ConfigError::InvalidValue {
                field: "generation.temperature".to_string(),
                value: temp.to_string(),
            }
            .into());
        }

        seconds_to_duration(
            "generation.connect_timeout_secs",
            self.generation.connect_timeout_secs,
        )?;
        seconds_to_duration("generation.read_timeout_secs", self.generation.read_timeout_secs)?;
        seconds_to_duration(
            "generation.retry.backoff_factor_secs",
            self.generation.retry.backoff_factor_secs,
        )?;

        if self.generation.max_new_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.max_new_tokens".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_iterations".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.data.database_path.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "data.database_path".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value).map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()),
    }
}
