//! HTTP client for the instruction/input `/generate` endpoint

use crate::config::{seconds_to_duration, GenerationConfig, RetryPolicy};
use crate::error::{LlmError, Result};
use crate::llm::{GenerateRequest, GenerateResponse, LlmClient};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Generation client with connection pooling and bounded retries
pub struct HttpGenerateClient {
    client: Client,
    endpoint: Option<Url>,
    defaults: GenerationConfig,
}

impl HttpGenerateClient {
    /// Create a new client from generation settings
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let endpoint = match &config.endpoint {
            Some(raw) => Some(Url::parse(raw).map_err(|e| LlmError::InvalidResponse {
                message: format!("Invalid endpoint '{}': {}", raw, e),
            })?),
            None => None,
        };

        let connect_timeout = seconds_to_duration(
            "generation.connect_timeout_secs",
            config.connect_timeout_secs,
        )?;
        let read_timeout =
            seconds_to_duration("generation.read_timeout_secs", config.read_timeout_secs)?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            defaults: config.clone(),
        })
    }

    /// Whether an endpoint was configured
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Ask the server to load another model version
    pub async fn switch_model(&self, model_version: &str) -> Result<Value> {
        let endpoint = self.endpoint.as_ref().ok_or(LlmError::NotConfigured)?;
        let url = switch_model_url(endpoint);

        info!("🔁 Switching model version to {}", model_version);
        let response = self
            .post_with_retry(&url, &json!({ "model_version": model_version }), None)
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        response.json::<Value>().await.map_err(|e| {
            LlmError::InvalidResponse {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// POST a JSON body, retrying transient failures per the retry policy.
    /// A retryable status on the last attempt is returned to the caller as-is.
    async fn post_with_retry<B: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let policy: &RetryPolicy = &self.defaults.retry;
        let mut attempt: u32 = 0;

        loop {
            let mut builder = self.client.post(url.clone()).json(body);
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt < policy.max_retries && policy.should_retry(status) {
                        attempt += 1;
                        warn!(
                            "Generation endpoint returned {}, retry {}/{}",
                            status, attempt, policy.max_retries
                        );
                        tokio::time::sleep(policy.backoff(attempt)).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if attempt < policy.max_retries && (e.is_connect() || e.is_timeout()) => {
                    attempt += 1;
                    warn!(
                        "Generation request failed ({}), retry {}/{}",
                        e, attempt, policy.max_retries
                    );
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(LlmError::Timeout {
                        message: e.to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    return Err(LlmError::Network {
                        message: e.to_string(),
                    }
                    .into());
                }
            }
        }
    }
}

#[async_trait]
impl LlmClient for HttpGenerateClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let endpoint = self.endpoint.as_ref().ok_or(LlmError::NotConfigured)?;
        let start = Instant::now();

        debug!(
            "Generation request: model_version={}, max_new_tokens={}, temperature={}",
            request.model_version, request.max_new_tokens, request.temperature
        );

        let response = self
            .post_with_retry(endpoint, &request, request.timeout)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    message: e.to_string(),
                }
            } else {
                LlmError::InvalidResponse {
                    message: e.to_string(),
                }
            }
        })?;

        info!(
            "🤖 Generation finished in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        Ok(body.into_text())
    }

    fn request(&self, instruction: &str, input: &str) -> GenerateRequest {
        GenerateRequest {
            instruction: instruction.to_string(),
            input: input.to_string(),
            model_version: self.defaults.model_version.clone(),
            max_new_tokens: self.defaults.max_new_tokens,
            temperature: self.defaults.temperature,
            timeout: None,
        }
    }

    fn model_version(&self) -> &str {
        &self.defaults.model_version
    }
}

/// `/switch_model` sibling of the `/generate` endpoint
fn switch_model_url(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    let path = endpoint.path().trim_end_matches('/');
    let new_path = match path.strip_suffix("/generate") {
        Some(prefix) => format!("{}/switch_model", prefix),
        None => format!("{}/switch_model", path),
    };
    url.set_path(&new_path);
    url
}
