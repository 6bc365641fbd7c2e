//! Guideline retrieval tool

use crate::error::Result;
use crate::impl_tool_factory;
use crate::rag::ContextRetriever;
use crate::tools::{Tool, ToolContext, ToolExample, ToolRequest};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Returns laws and guideline passages relevant to a question
pub struct RagSearchTool {
    retriever: Arc<dyn ContextRetriever>,
}

impl RagSearchTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            retriever: ctx.retriever.clone(),
        }
    }
}

#[async_trait]
impl Tool for RagSearchTool {
    fn name(&self) -> &str {
        "rag_search"
    }

    fn description(&self) -> &str {
        "질문과 관련된 법령, 지침 근거(RAG 컨텍스트)를 반환합니다."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "검색할 질문"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, request: ToolRequest) -> Result<String> {
        match request {
            ToolRequest::RagSearch { question } => {
                Ok(self.retriever.get_relevant_context(&question))
            }
            other => Err(other.mismatch(self.name())),
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "종사자 인건비 지침 검색".to_string(),
            parameters: json!({"question": "지역아동센터 종사자 인건비 기준"}),
            expected_result: "출처가 표시된 지침 문단".to_string(),
        }]
    }
}

impl_tool_factory!(
    RagSearchToolFactory,
    RagSearchTool,
    "rag_search",
    "Search laws and operating guidelines"
);
