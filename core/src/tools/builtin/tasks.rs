//! Report and policy writing tools

use super::generate::generate_text;
use crate::error::Result;
use crate::impl_tool_factory;
use crate::llm::LlmClient;
use crate::tools::{Tool, ToolContext, ToolExample, ToolRequest};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const REPORT_INSTRUCTION: &str = concat!(
    "너는 서울시 아동복지 정책 전문가다. 반드시 한국어로 답해.\n",
    "제공된 데이터를 바탕으로 아래 형식을 정확히 지켜서 보고서를 작성해. (딱 3줄만, 추가 설명 금지)\n",
    "- 요약: 한 문장\n",
    "- 가능 요인: 한 문장\n",
    "- 추가 데이터: 한 문장\n",
    "※ 데이터 범위 밖은 추측하지 말고 '자료에 없음'이라고 말해."
);

pub const POLICY_INSTRUCTION: &str = concat!(
    "너는 서울시 아동복지 정책 전문가다. 반드시 한국어로 답해라.\n",
    "제공된 데이터를 바탕으로 정책 아이디어 3가지를 한 줄씩만 제시해라. 추가 설명 금지.\n",
    "형식:\n1) ...\n2) ...\n3) ...\n"
);

const REPORT_TEMPERATURE: f32 = 0.1;
const POLICY_TEMPERATURE: f32 = 0.3;

fn task_input(district: &str, data_context: &str) -> String {
    format!("지역: {}\n데이터:\n{}", district, data_context)
}

fn task_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "data_context": {
                "type": "string",
                "description": "DB 등에서 조회된 통계 데이터 텍스트"
            },
            "district": {
                "type": "string",
                "description": "대상 자치구 이름"
            }
        },
        "required": ["data_context", "district"]
    })
}

async fn run_task(
    generator: &dyn LlmClient,
    instruction: &str,
    temperature: f32,
    district: &str,
    data_context: &str,
) -> String {
    let request = generator
        .request(instruction, &task_input(district, data_context))
        .with_model_version("final")
        .with_temperature(temperature);
    generate_text(generator, request).await
}

/// Writes a three-line district report from statistics
pub struct ReportTaskTool {
    generator: Arc<dyn LlmClient>,
}

impl ReportTaskTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            generator: ctx.generator.clone(),
        }
    }
}

#[async_trait]
impl Tool for ReportTaskTool {
    fn name(&self) -> &str {
        "create_report_task"
    }

    fn description(&self) -> &str {
        "수집된 통계 데이터를 바탕으로 서울시 아동복지 보고서를 작성합니다."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        task_schema()
    }

    async fn execute(&self, request: ToolRequest) -> Result<String> {
        match request {
            ToolRequest::CreateReportTask {
                data_context,
                district,
            } => Ok(run_task(
                self.generator.as_ref(),
                REPORT_INSTRUCTION,
                REPORT_TEMPERATURE,
                &district,
                &data_context,
            )
            .await),
            other => Err(other.mismatch(self.name())),
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "강남구 보고서 작성".to_string(),
            parameters: json!({
                "data_context": "강남구 예측 데이터:\n- 2025년: 1200명",
                "district": "강남구"
            }),
            expected_result: "요약/가능 요인/추가 데이터 3줄 보고서".to_string(),
        }]
    }
}

/// Proposes three district-specific policy ideas from statistics
pub struct PolicyTaskTool {
    generator: Arc<dyn LlmClient>,
}

impl PolicyTaskTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            generator: ctx.generator.clone(),
        }
    }
}

#[async_trait]
impl Tool for PolicyTaskTool {
    fn name(&self) -> &str {
        "create_policy_task"
    }

    fn description(&self) -> &str {
        "통계 데이터를 분석하여 자치구 맞춤형 정책 아이디어 3가지를 제안합니다."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        task_schema()
    }

    async fn execute(&self, request: ToolRequest) -> Result<String> {
        match request {
            ToolRequest::CreatePolicyTask {
                data_context,
                district,
            } => Ok(run_task(
                self.generator.as_ref(),
                POLICY_INSTRUCTION,
                POLICY_TEMPERATURE,
                &district,
                &data_context,
            )
            .await),
            other => Err(other.mismatch(self.name())),
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "중구 정책 제안".to_string(),
            parameters: json!({
                "data_context": "중구 예측 데이터:\n- 2026년: 310명",
                "district": "중구"
            }),
            expected_result: "번호가 매겨진 정책 아이디어 3줄".to_string(),
        }]
    }
}

impl_tool_factory!(
    ReportTaskToolFactory,
    ReportTaskTool,
    "create_report_task",
    "Write a district report from statistics"
);

impl_tool_factory!(
    PolicyTaskToolFactory,
    PolicyTaskTool,
    "create_policy_task",
    "Propose district policy ideas from statistics"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{context_with_generator, FakeGenerator};

    #[tokio::test]
    async fn test_report_task_request() {
        let generator = Arc::new(FakeGenerator::replying("- 요약: 증가\n- 가능 요인: 인구\n- 추가 데이터: 없음"));
        let tool = ReportTaskTool::new(&context_with_generator(generator.clone()));

        let text = tool
            .execute(ToolRequest::CreateReportTask {
                data_context: "2025년: 1200명".to_string(),
                district: "강남구".to_string(),
            })
            .await
            .unwrap();
        assert!(text.starts_with("- 요약: 증가"));

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].instruction, REPORT_INSTRUCTION);
        assert_eq!(requests[0].input, "지역: 강남구\n데이터:\n2025년: 1200명");
        assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_policy_task_request() {
        let generator = Arc::new(FakeGenerator::replying("1) a\n2) b\n3) c"));
        let tool = PolicyTaskTool::new(&context_with_generator(generator.clone()));

        tool.execute(ToolRequest::CreatePolicyTask {
            data_context: "데이터 없음".to_string(),
            district: "중구".to_string(),
        })
        .await
        .unwrap();

        let requests = generator.requests();
        assert_eq!(requests[0].instruction, POLICY_INSTRUCTION);
        assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(requests[0].model_version, "final");
    }

    #[tokio::test]
    async fn test_generation_failure_is_text() {
        let generator = Arc::new(FakeGenerator::failing());
        let tool = PolicyTaskTool::new(&context_with_generator(generator));
        let text = tool
            .execute(ToolRequest::CreatePolicyTask {
                data_context: String::new(),
                district: "중구".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(text, super::super::generate::NOT_CONFIGURED_MESSAGE);
    }
}
