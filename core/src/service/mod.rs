//! Application service tying the agent, tools and data together

use crate::agent::prompt::{policy_mission, report_mission};
use crate::agent::{
    AgentConfig, AgentOutcome, ConversationMemory, ToolAgentBuilder, POLICY_SYSTEM_PROMPT,
    QA_SYSTEM_PROMPT, REPORT_SYSTEM_PROMPT,
};
use crate::config::{AppConfig, LOCAL_TOOLS};
use crate::error::{AgentError, ForecastError, Result};
use crate::forecast::{
    bound_forecasts, check_forecasts, check_history, district_from_text, forecast_context,
    BoundedForecast, BoundingPolicy, ForecastRow, ForecastStore, HistoryRow, RawForecast,
    SqliteForecastStore, FIRST_FORECAST_YEAR, LAST_FORECAST_YEAR,
};
use crate::llm::{BlockingCompletion, HttpGenerateClient, LlmClient};
use crate::mcp::ToolClient;
use crate::rag::{ContextRetriever, LazyRetriever};
use crate::tools::{ToolContext, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

const SUMMARY_MARKER: &str = "- 요약:";
const FACTORS_MARKER: &str = "- 가능 요인:";
const DEFAULT_SUMMARY: &str = "분석 완료";

/// District report returned by [`GenAiService::generate_report`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub summary: String,
    pub content: String,
}

impl Report {
    pub fn from_answer(district: &str, answer: &str) -> Self {
        Self {
            title: format!("{} 지역아동센터 수요 분석", district),
            summary: extract_summary(answer).unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            content: answer.to_string(),
        }
    }
}

/// Text between "- 요약:" and "- 가능 요인:", if the answer has a summary line
fn extract_summary(answer: &str) -> Option<String> {
    let (_, rest) = answer.split_once(SUMMARY_MARKER)?;
    let summary = rest.split(FACTORS_MARKER).next().unwrap_or(rest).trim();
    Some(summary.to_string())
}

/// Explicitly constructed service holding every long-lived resource.
///
/// The agent-driven methods block the calling thread; from async code run
/// them inside `tokio::task::spawn_blocking`.
pub struct GenAiService {
    config: AppConfig,
    generator: Arc<dyn LlmClient>,
    store: Arc<dyn ForecastStore>,
    retriever: Arc<dyn ContextRetriever>,
    tool_client: ToolClient,
    memory: ConversationMemory,
    handle: Handle,
}

impl GenAiService {
    /// Build the service from configuration. Guideline documents are
    /// loaded on first retrieval, not here.
    pub fn new(config: AppConfig, handle: Handle) -> Result<Self> {
        config.validate()?;
        let generator: Arc<dyn LlmClient> = Arc::new(HttpGenerateClient::new(&config.generation)?);
        let store: Arc<dyn ForecastStore> =
            Arc::new(SqliteForecastStore::open(config.data.expanded_database_path())?);
        let retriever: Arc<dyn ContextRetriever> = Arc::new(LazyRetriever::new(
            config.data.expanded_rag_path(),
            config.data.rag_top_k,
        ));
        Self::from_parts(config, generator, store, retriever, handle)
    }

    /// Build the service around existing components
    pub fn from_parts(
        config: AppConfig,
        generator: Arc<dyn LlmClient>,
        store: Arc<dyn ForecastStore>,
        retriever: Arc<dyn ContextRetriever>,
        handle: Handle,
    ) -> Result<Self> {
        let context = ToolContext {
            retriever: retriever.clone(),
            store: store.clone(),
            generator: generator.clone(),
        };
        let tool_client = if config.mcp.url == LOCAL_TOOLS {
            ToolClient::local(Arc::new(ToolRegistry::with_context(&context)))
        } else {
            ToolClient::http(&config.mcp)?
        };
        info!("Tools reachable at {}", tool_client.endpoint());

        Ok(Self {
            memory: ConversationMemory::new(config.agent.memory_capacity),
            config,
            generator,
            store,
            retriever,
            tool_client,
            handle,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    pub fn tool_client(&self) -> &ToolClient {
        &self.tool_client
    }

    /// Tool registry over this service's data, as served to remote agents
    pub fn registry(&self) -> ToolRegistry {
        ToolRegistry::with_context(&ToolContext {
            retriever: self.retriever.clone(),
            store: self.store.clone(),
            generator: self.generator.clone(),
        })
    }

    /// Answer a free-form question with the QA agent and remember the exchange
    pub fn answer_question(&mut self, question: &str) -> Result<AgentOutcome> {
        let history = self.memory.recent(self.config.agent.history_window);
        let outcome = self.run_agent(question, QA_SYSTEM_PROMPT, &history)?;
        if !outcome.is_exhausted() {
            self.memory.record(question, &outcome.answer);
        }
        Ok(outcome)
    }

    /// Have the report agent fetch forecasts and write a district report
    pub fn generate_report(&self, district: &str, start_year: i32, end_year: i32) -> Result<Report> {
        let district = district.trim();
        if district.is_empty() || start_year > end_year {
            return Err(AgentError::ReportFailed {
                message: "자치구와 연도를 모두 선택해주세요.".to_string(),
            }
            .into());
        }

        let query = report_mission(district, start_year, end_year);
        let outcome = self.run_agent(&query, REPORT_SYSTEM_PROMPT, &[])?;
        Ok(Report::from_answer(district, &outcome.answer))
    }

    /// Have the policy agent propose district policies for a request.
    /// The district named in the prompt (or the whole city) and its stored
    /// predictions are attached to the mission.
    pub fn generate_policy(&self, prompt: &str) -> Result<String> {
        let district = district_from_text(prompt);
        let data = forecast_context(
            self.store.as_ref(),
            district,
            FIRST_FORECAST_YEAR,
            LAST_FORECAST_YEAR,
        )?;
        let query = format!(
            "{}\n지역: {}\n예측 데이터:\n{}",
            policy_mission(prompt),
            district,
            data
        );
        Ok(self.run_agent(&query, POLICY_SYSTEM_PROMPT, &[])?.answer)
    }

    /// Change the sampling settings used for agent completions
    pub fn update_settings(&mut self, temperature: f32, max_new_tokens: u32) {
        info!(
            "Generation settings updated: temperature={}, max_new_tokens={}",
            temperature, max_new_tokens
        );
        self.config.generation.temperature = temperature;
        self.config.generation.max_new_tokens = max_new_tokens;
    }

    /// Replace all stored history with `rows`
    pub fn import_history(&self, rows: &[HistoryRow]) -> Result<usize> {
        check_history(rows)?;
        let written = self.store.replace_history(rows)?;
        info!("Imported {} history row(s)", written);
        Ok(written)
    }

    /// Replace every stored prediction after the last history year with `rows`
    pub fn import_forecasts(&self, rows: &[ForecastRow]) -> Result<usize> {
        check_forecasts(rows)?;
        let from_year = BoundingPolicy::default().last_history_year + 1;
        if let Some(early) = rows.iter().find(|row| row.year < from_year) {
            return Err(ForecastError::InvalidInput {
                message: format!(
                    "{} {}: predictions must start from {}",
                    early.district, early.year, from_year
                ),
            }
            .into());
        }
        let written = self.store.replace_future(from_year, rows)?;
        info!("Imported {} forecast row(s)", written);
        Ok(written)
    }

    /// Bound raw predictions against stored history and, unless `dry_run`,
    /// replace every stored prediction after the last history year.
    ///
    /// Writing requires history for every district; a preview does not.
    pub fn rebound_forecasts(
        &self,
        raw: &[RawForecast],
        model_version: &str,
        dry_run: bool,
    ) -> Result<Vec<BoundedForecast>> {
        let policy = BoundingPolicy::default();
        let history = self.store.history(None)?;
        if !dry_run {
            if let Some(missing) = raw
                .iter()
                .find(|r| !history.iter().any(|h| h.district == r.district))
            {
                return Err(ForecastError::NoHistory {
                    district: missing.district.clone(),
                }
                .into());
            }
        }
        let bounded = bound_forecasts(&policy, &history, raw);

        if !dry_run {
            let rows: Vec<ForecastRow> = bounded
                .iter()
                .map(|row| ForecastRow {
                    district: row.district.clone(),
                    year: row.year,
                    predicted_child_user: row.child_user,
                    model_version: Some(model_version.to_string()),
                })
                .collect();
            let written = self
                .store
                .replace_future(policy.last_history_year + 1, &rows)?;
            info!("Replaced future forecasts with {} bounded row(s)", written);
        }

        Ok(bounded)
    }

    fn run_agent(&self, query: &str, instruction: &str, history: &[String]) -> Result<AgentOutcome> {
        let completion = BlockingCompletion::new(self.generator.clone(), self.handle.clone())
            .with_temperature(self.config.generation.temperature)
            .with_max_new_tokens(self.config.generation.max_new_tokens);
        let agent = ToolAgentBuilder::new(Arc::new(completion), self.tool_client.clone())
            .with_agent_config(AgentConfig::from(&self.config.agent))
            .build()?;
        Ok(agent.run_detailed(query, instruction, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Termination, FALLBACK_ANSWER};
    use crate::llm::GenerateRequest;
    use crate::rag::NO_CONTEXT;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::runtime::Runtime;

    /// Generation client replaying scripted completions
    struct ScriptedClient {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(&self, request: GenerateRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
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

    struct NoGuidelines;

    impl ContextRetriever for NoGuidelines {
        fn get_relevant_context(&self, _question: &str) -> String {
            NO_CONTEXT.to_string()
        }
    }

    fn service(runtime: &Runtime, client: Arc<ScriptedClient>) -> GenAiService {
        let mut config = AppConfig::default();
        config.mcp.url = LOCAL_TOOLS.to_string();

        let store = SqliteForecastStore::open_in_memory().unwrap();
        store
            .replace_future(
                2023,
                &[ForecastRow {
                    district: "강남구".to_string(),
                    year: 2025,
                    predicted_child_user: 1200.0,
                    model_version: None,
                }],
            )
            .unwrap();

        GenAiService::from_parts(
            config,
            client,
            Arc::new(store),
            Arc::new(NoGuidelines),
            runtime.handle().clone(),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_summary() {
        let answer = "- 요약: 이용 아동이 늘어납니다.\n- 가능 요인: 인구 유입\n- 추가 데이터: 자료에 없음";
        assert_eq!(extract_summary(answer).as_deref(), Some("이용 아동이 늘어납니다."));
        assert_eq!(extract_summary("요약 없음"), None);

        let report = Report::from_answer("강남구", "형식 없는 답변");
        assert_eq!(report.title, "강남구 지역아동센터 수요 분석");
        assert_eq!(report.summary, "분석 완료");
    }

    #[test]
    fn test_generate_report_through_local_tools() {
        let runtime = Runtime::new().unwrap();
        let client = ScriptedClient::new(&[
            "Thought: 데이터 조회\nAction: db_forecast_search\nAction Input: {\"district\": \"강남구\", \"start_year\": 2025, \"end_year\": 2025}",
            "Final Answer: - 요약: 2025년 1200명으로 예측됩니다.\n- 가능 요인: 인구 유입\n- 추가 데이터: 자료에 없음",
        ]);
        let service = service(&runtime, client.clone());

        let report = service.generate_report("강남구", 2025, 2025).unwrap();
        assert_eq!(report.summary, "2025년 1200명으로 예측됩니다.");
        assert!(report.content.contains("가능 요인"));

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].input.contains("[지시상황] 강남구의 2025~2025년"));
        assert!(requests[1].input.contains("강남구 예측 데이터:\n- 2025년: 1200명"));
    }

    #[test]
    fn test_model_supplied_timeout_overflow_stays_an_observation() {
        let runtime = Runtime::new().unwrap();
        let client = ScriptedClient::new(&[
            "Action: llama_generate\nAction Input: {\"instruction\": \"a\", \"input_text\": \"b\", \"timeout_read\": 1e300}",
            "생성 결과",
            "Final Answer: 생성 결과를 확인했습니다.",
        ]);
        let mut service = service(&runtime, client.clone());

        let outcome = service.answer_question("생성해줘").unwrap();
        assert_eq!(outcome.termination, Termination::FinalAnswer);
        assert_eq!(outcome.answer, "생성 결과를 확인했습니다.");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[1].timeout, None);
        assert!(requests[2].input.contains("생성 결과"));
    }

    #[test]
    fn test_report_requires_district_and_years() {
        let runtime = Runtime::new().unwrap();
        let service = service(&runtime, ScriptedClient::new(&[]));
        assert!(service.generate_report(" ", 2023, 2030).is_err());
        assert!(service.generate_report("중구", 2030, 2023).is_err());
    }

    #[test]
    fn test_answer_question_records_memory() {
        let runtime = Runtime::new().unwrap();
        let client = ScriptedClient::new(&["Final Answer: 안녕하세요!", "", "", ""]);
        let mut service = service(&runtime, client.clone());

        let outcome = service.answer_question("안녕").unwrap();
        assert_eq!(outcome.answer, "안녕하세요!");
        assert_eq!(service.memory().recent(5), vec!["Q: 안녕 / A: 안녕하세요!"]);

        // exhausted runs are not remembered
        let outcome = service.answer_question("강남구 예측은?").unwrap();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.answer, FALLBACK_ANSWER);
        assert_eq!(service.memory().len(), 1);

        let requests = client.requests.lock().unwrap();
        assert!(requests[1].input.contains("Q: 안녕 / A: 안녕하세요!"));
    }

    #[test]
    fn test_update_settings_applies_to_completions() {
        let runtime = Runtime::new().unwrap();
        let client = ScriptedClient::new(&["Final Answer: 네, 알겠습니다."]);
        let mut service = service(&runtime, client.clone());

        service.update_settings(0.7, 128);
        service.answer_question("설정 확인").unwrap();

        let requests = client.requests.lock().unwrap();
        assert!((requests[0].temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(requests[0].max_new_tokens, 128);
    }

    #[test]
    fn test_rebound_forecasts_writes_bounded_rows() {
        let runtime = Runtime::new().unwrap();
        let mut config = AppConfig::default();
        config.mcp.url = LOCAL_TOOLS.to_string();
        let store = Arc::new(SqliteForecastStore::open_in_memory().unwrap());
        store
            .replace_history(&[
                HistoryRow {
                    district: "중구".to_string(),
                    year: 2021,
                    child_user: Some(90.0),
                },
                HistoryRow {
                    district: "중구".to_string(),
                    year: 2022,
                    child_user: Some(100.0),
                },
            ])
            .unwrap();
        let service = GenAiService::from_parts(
            config,
            ScriptedClient::new(&[]),
            store.clone(),
            Arc::new(NoGuidelines),
            runtime.handle().clone(),
        )
        .unwrap();

        let raw = [RawForecast {
            district: "중구".to_string(),
            year: 2023,
            child_user_raw: 500.0,
        }];

        let preview = service.rebound_forecasts(&raw, "final", true).unwrap();
        assert!(preview[0].was_capped());
        assert!(store.district_forecast("중구", 2023, 2023).unwrap().is_empty());

        let written = service.rebound_forecasts(&raw, "final", false).unwrap();
        let stored = store.district_forecast("중구", 2023, 2023).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].predicted_child_user, written[0].child_user);
        assert_eq!(stored[0].model_version.as_deref(), Some("final"));

        let unknown = [RawForecast {
            district: "강남구".to_string(),
            year: 2023,
            child_user_raw: 10.0,
        }];
        let err = service.rebound_forecasts(&unknown, "final", false).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Forecast(ForecastError::NoHistory { ref district }) if district == "강남구"
        ));
        assert!(service.rebound_forecasts(&unknown, "final", true).is_ok());
    }

    #[test]
    fn test_imports_replace_tables() {
        let runtime = Runtime::new().unwrap();
        let service = service(&runtime, ScriptedClient::new(&[]));

        let history = [HistoryRow {
            district: "중구".to_string(),
            year: 2022,
            child_user: Some(100.0),
        }];
        assert_eq!(service.import_history(&history).unwrap(), 1);
        assert_eq!(service.import_history(&history).unwrap(), 1);
        assert_eq!(service.store.history(None).unwrap().len(), 1);

        let forecasts = [ForecastRow {
            district: "중구".to_string(),
            year: 2024,
            predicted_child_user: 110.0,
            model_version: None,
        }];
        service.import_forecasts(&forecasts).unwrap();
        // the seeded 강남구 row was replaced
        assert!(service.store.district_forecast("강남구", 2023, 2030).unwrap().is_empty());
        assert_eq!(service.store.district_forecast("중구", 2024, 2024).unwrap().len(), 1);

        let early = [ForecastRow {
            year: 2020,
            ..forecasts[0].clone()
        }];
        assert!(matches!(
            service.import_forecasts(&early),
            Err(crate::Error::Forecast(ForecastError::InvalidInput { .. }))
        ));
        let blank = [HistoryRow {
            district: String::new(),
            ..history[0].clone()
        }];
        assert!(service.import_history(&blank).is_err());
    }

    #[test]
    fn test_policy_mission_carries_district_forecasts() {
        let runtime = Runtime::new().unwrap();
        let client = ScriptedClient::new(&[
            "Final Answer: 1) 돌봄 확충\n2) 야간 운영\n3) 인력 지원",
        ]);
        let service = service(&runtime, client.clone());

        let answer = service.generate_policy("강남구 돌봄 정책 제안").unwrap();
        assert!(answer.starts_with("1) 돌봄 확충"));

        let requests = client.requests.lock().unwrap();
        assert!(requests[0].input.contains("[임무] 강남구 돌봄 정책 제안"));
        assert!(requests[0].input.contains("지역: 강남구\n예측 데이터:\n2025년: 1200명"));
    }
}
