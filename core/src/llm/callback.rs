//! Synchronous completion callback used by the agent loop

use crate::llm::LlmClient;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::error;

/// Black-box `(instruction, input) -> completion` function.
///
/// Implementations block the calling thread for one completion. An empty
/// string means "no response".
pub trait LlmCallback: Send + Sync {
    fn complete(&self, instruction: &str, input: &str) -> String;
}

impl<F> LlmCallback for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn complete(&self, instruction: &str, input: &str) -> String {
        self(instruction, input)
    }
}

/// Drives an async [`LlmClient`] to completion on a runtime handle.
///
/// Must be called from a thread that is not itself running async tasks,
/// e.g. inside `tokio::task::spawn_blocking`.
pub struct BlockingCompletion {
    client: Arc<dyn LlmClient>,
    handle: Handle,
    temperature: Option<f32>,
    max_new_tokens: Option<u32>,
}

impl BlockingCompletion {
    pub fn new(client: Arc<dyn LlmClient>, handle: Handle) -> Self {
        Self {
            client,
            handle,
            temperature: None,
            max_new_tokens: None,
        }
    }

    /// Override the client's default sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = Some(max_new_tokens);
        self
    }
}

impl LlmCallback for BlockingCompletion {
    fn complete(&self, instruction: &str, input: &str) -> String {
        let mut request = self.client.request(instruction, input);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_new_tokens) = self.max_new_tokens {
            request = request.with_max_new_tokens(max_new_tokens);
        }
        match self.handle.block_on(self.client.generate(request)) {
            Ok(text) => text,
            Err(e) => {
                error!("Completion failed: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, Result};
    use crate::llm::GenerateRequest;
    use async_trait::async_trait;

    struct EchoClient {
        fail: bool,
    }

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn generate(&self, request: GenerateRequest) -> Result<String> {
            if self.fail {
                return Err(LlmError::NotConfigured.into());
            }
            Ok(format!("{}|{}", request.instruction, request.input))
        }

        fn request(&self, instruction: &str, input: &str) -> GenerateRequest {
            GenerateRequest {
                instruction: instruction.to_string(),
                input: input.to_string(),
                model_version: "final".to_string(),
                max_new_tokens: 16,
                temperature: 0.0,
                timeout: None,
            }
        }

        fn model_version(&self) -> &str {
            "final"
        }
    }

    #[test]
    fn test_closure_is_a_callback() {
        let callback = |instruction: &str, input: &str| format!("{}:{}", instruction, input);
        assert_eq!(callback.complete("a", "b"), "a:b");
    }

    #[test]
    fn test_blocking_completion_drives_client() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let completion =
            BlockingCompletion::new(Arc::new(EchoClient { fail: false }), runtime.handle().clone());
        assert_eq!(completion.complete("지침", "입력"), "지침|입력");
    }

    #[test]
    fn test_blocking_completion_maps_errors_to_empty() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let completion =
            BlockingCompletion::new(Arc::new(EchoClient { fail: true }), runtime.handle().clone());
        assert_eq!(completion.complete("지침", "입력"), "");
    }
}
