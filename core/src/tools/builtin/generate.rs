//! Direct text generation tool

use crate::error::{Error, LlmError, Result};
use crate::impl_tool_factory;
use crate::llm::{GenerateRequest, LlmClient};
use crate::tools::{Tool, ToolContext, ToolExample, ToolRequest};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const NOT_CONFIGURED_MESSAGE: &str = "RUNPOD_API_URL이 설정되지 않았습니다.";
pub const SERVER_ERROR_MESSAGE: &str =
    "AI 서버 오류로 답변 생성에 실패했습니다. 잠시 후 재시도 해주세요.";
pub const TIMEOUT_MESSAGE: &str = "AI 서버 응답이 지연되고 있습니다. 잠시 후 다시 시도해주세요.";
pub const NETWORK_MESSAGE: &str =
    "AI 서버 통신 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요.";
pub const UNKNOWN_MESSAGE: &str = "AI 서버 처리 중 알 수 없는 오류가 발생했습니다.";

/// User-facing text for a failed generation
pub fn failure_message(error: &Error) -> &'static str {
    match error {
        Error::Llm(LlmError::NotConfigured) => NOT_CONFIGURED_MESSAGE,
        Error::Llm(LlmError::ApiError { .. }) => SERVER_ERROR_MESSAGE,
        Error::Llm(LlmError::Timeout { .. }) => TIMEOUT_MESSAGE,
        Error::Llm(LlmError::Network { .. }) | Error::Http(_) => NETWORK_MESSAGE,
        _ => UNKNOWN_MESSAGE,
    }
}

/// Run one generation and fold any failure into its user-facing text
pub async fn generate_text(generator: &dyn LlmClient, request: GenerateRequest) -> String {
    let start = Instant::now();
    match generator.generate(request).await {
        Ok(text) => {
            info!(
                "Generation finished in {:.2}s",
                start.elapsed().as_secs_f64()
            );
            text
        }
        Err(e) => {
            warn!("Generation failed: {}", e);
            failure_message(&e).to_string()
        }
    }
}

/// Per-call bound from model-supplied timeouts, `None` when the sum is not a usable duration
fn call_timeout(timeout_connect: f64, timeout_read: f64) -> Option<Duration> {
    let secs = timeout_connect + timeout_read;
    if secs.is_nan() {
        return None;
    }
    Duration::try_from_secs_f64(secs.max(0.0)).ok()
}

/// Calls the text-generation endpoint with an instruction and input
pub struct GenerateTool {
    generator: Arc<dyn LlmClient>,
}

impl GenerateTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            generator: ctx.generator.clone(),
        }
    }
}

#[async_trait]
impl Tool for GenerateTool {
    fn name(&self) -> &str {
        "llama_generate"
    }

    fn description(&self) -> &str {
        "instruction과 input_text로 생성 모델을 호출하여 결과 텍스트를 반환합니다."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "instruction": {"type": "string", "description": "모델 지시문"},
                "input_text": {"type": "string", "description": "입력 텍스트"},
                "model_version": {"type": "string", "default": "final"},
                "temperature": {"type": "number", "default": 0.3},
                "max_new_tokens": {"type": "integer", "default": 512},
                "timeout_connect": {"type": "number", "default": 10.0},
                "timeout_read": {"type": "number", "default": 180.0}
            },
            "required": ["instruction", "input_text"]
        })
    }

    async fn execute(&self, request: ToolRequest) -> Result<String> {
        match request {
            ToolRequest::LlamaGenerate {
                instruction,
                input_text,
                model_version,
                temperature,
                max_new_tokens,
                timeout_connect,
                timeout_read,
            } => {
                let mut request = self
                    .generator
                    .request(&instruction, &input_text)
                    .with_model_version(model_version)
                    .with_temperature(temperature)
                    .with_max_new_tokens(max_new_tokens);

                // the client's connect timeout is fixed; the per-call bound covers both phases
                match call_timeout(timeout_connect, timeout_read) {
                    Some(timeout) => request = request.with_timeout(timeout),
                    None => warn!(
                        "Ignoring unusable timeout ({} + {}s), using client default",
                        timeout_connect, timeout_read
                    ),
                }
                Ok(generate_text(self.generator.as_ref(), request).await)
            }
            other => Err(other.mismatch(self.name())),
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "짧은 요약 생성".to_string(),
            parameters: json!({
                "instruction": "한 문장으로 요약해.",
                "input_text": "강남구 2025년 예측: 1200명",
                "temperature": 0.1
            }),
            expected_result: "생성된 텍스트".to_string(),
        }]
    }
}

impl_tool_factory!(
    GenerateToolFactory,
    GenerateTool,
    "llama_generate",
    "Generate text with the hosted model"
);
