//! Tool system and built-in tools

pub mod base;
pub mod builtin;
pub mod registry;
pub mod request;

pub use base::{Tool, ToolCall, ToolDefinition, ToolExample, ToolExecutor, ToolResult};
pub use registry::{ToolContext, ToolFactory, ToolRegistry};
pub use request::{ToolRequest, TOOL_NAMES};

#[cfg(test)]
pub(crate) mod test_support {
    use super::ToolContext;
    use crate::error::{LlmError, Result};
    use crate::forecast::{ForecastRow, ForecastStore, SqliteForecastStore};
    use crate::llm::{GenerateRequest, LlmClient};
    use crate::rag::{ContextRetriever, NO_CONTEXT};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Generator that records requests and replies with fixed text
    pub struct FakeGenerator {
        reply: Option<String>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl FakeGenerator {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<GenerateRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for FakeGenerator {
        async fn generate(&self, request: GenerateRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            self.reply
                .clone()
                .ok_or_else(|| LlmError::NotConfigured.into())
        }

        fn request(&self, instruction: &str, input: &str) -> GenerateRequest {
            GenerateRequest {
                instruction: instruction.to_string(),
                input: input.to_string(),
                model_version: "final".to_string(),
                max_new_tokens: 512,
                temperature: 0.3,
                timeout: None,
            }
        }

        fn model_version(&self) -> &str {
            "final"
        }
    }

    struct FixedRetriever;

    impl ContextRetriever for FixedRetriever {
        fn get_relevant_context(&self, question: &str) -> String {
            if question.contains("인건비") {
                "[출처: 테스트 지침]\n인건비 관련 문단".to_string()
            } else {
                NO_CONTEXT.to_string()
            }
        }
    }

    fn store(forecasts: &[(&str, i32, f64)]) -> Arc<dyn ForecastStore> {
        let store = SqliteForecastStore::open_in_memory().unwrap();
        let rows: Vec<ForecastRow> = forecasts
            .iter()
            .map(|(district, year, value)| ForecastRow {
                district: district.to_string(),
                year: *year,
                predicted_child_user: *value,
                model_version: Some("final".to_string()),
            })
            .collect();
        store.replace_future(2000, &rows).unwrap();
        Arc::new(store)
    }

    /// Context over seeded forecasts and a generator replying "생성된 답변"
    pub fn context(forecasts: &[(&str, i32, f64)]) -> ToolContext {
        ToolContext {
            retriever: Arc::new(FixedRetriever),
            store: store(forecasts),
            generator: Arc::new(FakeGenerator::replying("생성된 답변")),
        }
    }

    pub fn context_with_generator(generator: Arc<dyn LlmClient>) -> ToolContext {
        ToolContext {
            generator,
            ..context(&[])
        }
    }
}
