//! LLM client trait and request structures

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for text-generation clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a single instruction/input completion and return the generated text
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    /// Build a request carrying the client's default sampling settings
    fn request(&self, instruction: &str, input: &str) -> GenerateRequest;

    /// Get the default model version
    fn model_version(&self) -> &str;
}

/// Body of a `/generate` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// System-style instruction
    pub instruction: String,

    /// Prompt text, including any embedded transcript
    pub input: String,

    /// Model version served by the endpoint
    pub model_version: String,

    /// Maximum number of generated tokens
    pub max_new_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout override, not sent on the wire
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl GenerateRequest {
    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the token budget
    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Override the model version
    pub fn with_model_version<S: Into<String>>(mut self, model_version: S) -> Self {
        self.model_version = model_version.into();
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Body returned by `/generate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Generated text, trimmed
    pub fn into_text(self) -> String {
        self.text.unwrap_or_default().trim().to_string()
    }
}
