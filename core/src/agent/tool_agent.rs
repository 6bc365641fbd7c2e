//! The ReAct-style tool-calling loop

use super::config::AgentConfig;
use super::execution::{AgentOutcome, StepRecord, Termination, FALLBACK_ANSWER};
use super::parser::{
    interpret, normalize_response, strip_thought, truncate_at_stop_markers, ParsedStep,
    StepState, SYSTEM_NOTE_MARKER, THOUGHT_MARKER,
};
use super::prompt::is_mission;
use crate::llm::LlmCallback;
use crate::mcp::ToolClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Final answers shorter than this (in characters) are treated as empty
pub const MIN_ANSWER_CHARS: usize = 5;

const EMPTY_RESPONSE_NUDGE: &str =
    "\nThought: (이곳에 질문에 대한 분석을 적거나 바로 답변하십시오.)";
const SHORT_ANSWER_NOTE: &str =
    "시스템: 'Final Answer:' 뒤에 실질적이고 구체적인 답변 내용을 한국어로 작성하십시오.";
const PROTOCOL_NOTE: &str = "시스템: 다음 단계는 'Action: <도구명>'과 'Action Input: {...}'를 사용하여 도구를 호출하거나, 'Final Answer: <답변>'으로 마무리하는 것입니다.";

/// Growing prompt context of one run. Segments are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Vec<String>,
}

impl Transcript {
    /// Start a transcript from prior turns and the user question
    pub fn start(history: &[String], window: usize, query: &str) -> Self {
        let mut transcript = Self::default();
        if !history.is_empty() && window > 0 {
            let skip = history.len().saturating_sub(window);
            let recent: Vec<&str> = history[skip..].iter().map(String::as_str).collect();
            transcript.push(format!(
                "### 대화 기록 (History):\n{}\n\n",
                recent.join("\n")
            ));
        }
        transcript.push(format!("사용자 질문: {}\n", query));
        transcript
    }

    pub fn push<S: Into<String>>(&mut self, segment: S) {
        self.segments.push(segment.into());
    }

    /// Full transcript text
    pub fn render(&self) -> String {
        self.segments.concat()
    }

    /// Input for the next LLM call, primed with a thought marker
    pub fn prompt(&self) -> String {
        format!("{}\n{} ", self.render(), THOUGHT_MARKER)
    }

    /// Length in bytes of the rendered transcript
    pub fn len(&self) -> usize {
        self.segments.iter().map(String::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Drives an LLM callback through thought/action/observation turns
pub struct ToolAgent {
    llm: Arc<dyn LlmCallback>,
    tool_client: ToolClient,
    config: AgentConfig,
}

impl ToolAgent {
    pub fn new(llm: Arc<dyn LlmCallback>, tool_client: ToolClient, config: AgentConfig) -> Self {
        Self {
            llm,
            tool_client,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer a query, blocking the calling thread for every LLM and tool call
    pub fn run(&self, query: &str, instruction: &str, history: &[String]) -> String {
        self.run_detailed(query, instruction, history).answer
    }

    /// Same as [`ToolAgent::run`] but keeps the per-iteration record
    pub fn run_detailed(&self, query: &str, instruction: &str, history: &[String]) -> AgentOutcome {
        let started = Instant::now();
        let mission = is_mission(query);
        let max_iterations = self.config.max_iterations;
        let mut transcript = Transcript::start(history, self.config.history_window, query);
        let mut steps: Vec<StepRecord> = Vec::with_capacity(max_iterations);

        let finish = |answer: String, termination: Termination, steps: Vec<StepRecord>| {
            info!(
                "Agent finished after {} call(s): {:?}",
                steps.len(),
                termination
            );
            AgentOutcome {
                answer,
                llm_calls: steps.len(),
                termination,
                steps,
                duration_ms: started.elapsed().as_millis() as u64,
            }
        };

        for iteration in 1..=max_iterations {
            let step_started = Instant::now();
            let raw = self.llm.complete(instruction, &transcript.prompt());

            if raw.trim().is_empty() {
                warn!("Empty LLM response in loop {}. Nudging...", iteration);
                transcript.push(EMPTY_RESPONSE_NUDGE);
                let mut record = StepRecord::new(iteration, String::new(), StepState::AwaitingStep);
                record.duration_ms = step_started.elapsed().as_millis() as u64;
                steps.push(record);
                continue;
            }

            let response = truncate_at_stop_markers(&normalize_response(&raw));
            debug!("Loop {} response:\n{}", iteration, response);

            let parsed = interpret(&response);
            let mut record = StepRecord::new(iteration, response.clone(), StepState::of(&parsed));

            match parsed {
                Ok(ParsedStep::FinalAnswer(answer)) => {
                    if (!mission && !answer.is_empty())
                        || answer.chars().count() >= MIN_ANSWER_CHARS
                    {
                        record.duration_ms = step_started.elapsed().as_millis() as u64;
                        steps.push(record);
                        return finish(answer, Termination::FinalAnswer, steps);
                    }
                    warn!("Final answer is too short. Requesting substance.");
                    transcript.push(format!("\n{}\n{}", response, SHORT_ANSWER_NOTE));
                }
                Ok(ParsedStep::ToolCall(invocation)) => {
                    info!("Agent action: {}({:?})", invocation.name, invocation.arguments);
                    let observation = self
                        .tool_client
                        .call_tool(&invocation.name, invocation.arguments);
                    debug!("Observation: {}", observation);
                    transcript.push(format!("\n{}\nObservation: {}\n", response, observation));
                    record.tool = Some(invocation.name);
                    record.observation = Some(observation);
                }
                Err(e) => {
                    warn!("Could not parse action: {}", e);
                    let observation = format!(
                        "오류 발생({}). 한 번에 하나의 Action만 JSON 형식으로 제출하십시오.",
                        e
                    );
                    transcript.push(format!("\n{}\nObservation: {}\n", response, observation));
                    record.observation = Some(observation);
                }
                Ok(ParsedStep::Incomplete) => {
                    let clean = strip_thought(&response);

                    if !mission && clean.chars().count() > 2 && !clean.contains(SYSTEM_NOTE_MARKER)
                    {
                        info!("Implicit answer accepted for general question");
                        record.duration_ms = step_started.elapsed().as_millis() as u64;
                        steps.push(record);
                        return finish(clean, Termination::ImplicitAnswer, steps);
                    }

                    if iteration == max_iterations {
                        let text = match clean.split_once(SYSTEM_NOTE_MARKER) {
                            Some((before, _)) => before.trim().to_string(),
                            None => clean,
                        };
                        if !text.is_empty() {
                            record.duration_ms = step_started.elapsed().as_millis() as u64;
                            steps.push(record);
                            return finish(text, Termination::BestEffort, steps);
                        }
                    } else {
                        transcript.push(format!("\n{}\n{}", response, PROTOCOL_NOTE));
                    }
                }
            }

            debug!("Transcript length: {}", transcript.len());
            record.duration_ms = step_started.elapsed().as_millis() as u64;
            steps.push(record);
        }

        warn!("Agent exhausted {} iteration(s)", max_iterations);
        finish(FALLBACK_ANSWER.to_string(), Termination::Exhausted, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::{policy_mission, QA_SYSTEM_PROMPT};
    use crate::agent::ToolAgentBuilder;
    use crate::error::{McpError, Result};
    use crate::mcp::ToolTransport;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, Map<String, Value>)>>>;

    struct MockTransport {
        calls: Calls,
        reply: std::result::Result<String, String>,
    }

    #[async_trait]
    impl ToolTransport for MockTransport {
        async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
            self.calls.lock().unwrap().push((name.to_string(), arguments));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(McpError::Protocol {
                    message: message.clone(),
                }
                .into()),
            }
        }

        fn endpoint(&self) -> String {
            "mock".to_string()
        }
    }

    /// Scripted callback that records every input it receives
    struct Script {
        responses: Mutex<VecDeque<String>>,
        repeat_last: Option<String>,
        inputs: Mutex<Vec<String>>,
    }

    impl Script {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                repeat_last: None,
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn always(response: &str) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
                repeat_last: Some(response.to_string()),
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    impl LlmCallback for Script {
        fn complete(&self, _instruction: &str, input: &str) -> String {
            self.inputs.lock().unwrap().push(input.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.repeat_last.clone())
                .unwrap_or_default()
        }
    }

    fn agent_with(script: Arc<Script>, reply: std::result::Result<&str, &str>) -> (ToolAgent, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let transport = MockTransport {
            calls: calls.clone(),
            reply: reply.map(str::to_string).map_err(str::to_string),
        };
        let agent = ToolAgentBuilder::new(script, ToolClient::new(Arc::new(transport)))
            .build()
            .unwrap();
        (agent, calls)
    }

    #[test]
    fn test_greeting_returns_final_answer_immediately() {
        let script = Script::new(&["Final Answer: 안녕하세요, 무엇을 도와드릴까요?"]);
        let (agent, calls) = agent_with(script.clone(), Ok("unused"));

        let outcome = agent.run_detailed("안녕?", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(outcome.answer, "안녕하세요, 무엇을 도와드릴까요?");
        assert_eq!(outcome.llm_calls, 1);
        assert_eq!(outcome.termination, Termination::FinalAnswer);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(script.inputs()[0], "사용자 질문: 안녕?\n\nThought: ");
    }

    #[test]
    fn test_action_then_final_answer() {
        let script = Script::new(&[
            "강남구 데이터를 조회한다.\nAction: db_forecast_search\nAction Input: {\"district\": \"강남구\", \"start_year\": 2025, \"end_year\": 2025}",
            "Thought: 결과를 확인했다.\nFinal Answer: 강남구의 2025년 예측치는 1200명입니다.",
        ]);
        let (agent, calls) = agent_with(script.clone(), Ok("강남구 예측 데이터:\n- 2025년: 1200명"));

        let outcome = agent.run_detailed("강남구의 2025년 아동 인구 예측치를 알려줘", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(outcome.answer, "강남구의 2025년 예측치는 1200명입니다.");
        assert_eq!(outcome.llm_calls, 2);
        assert_eq!(outcome.tool_calls(), 1);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "db_forecast_search");
        assert_eq!(
            Value::Object(calls[0].1.clone()),
            json!({"district": "강남구", "start_year": 2025, "end_year": 2025})
        );

        let second_input = &script.inputs()[1];
        assert!(second_input.contains("Observation: 강남구 예측 데이터:\n- 2025년: 1200명\n"));
        assert!(second_input.contains("Thought: 강남구 데이터를 조회한다."));
        assert!(second_input.ends_with("\nThought: "));
    }

    #[test]
    fn test_exhaustion_returns_fallback() {
        let script = Script::always("Thought:");
        let (agent, calls) = agent_with(script.clone(), Ok("unused"));

        let outcome = agent.run_detailed("인건비 기준 알려줘", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(outcome.answer, FALLBACK_ANSWER);
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(script.inputs().len(), 3);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_responses_nudge_and_exhaust() {
        let script = Script::always("   ");
        let (agent, _) = agent_with(script.clone(), Ok("unused"));

        assert_eq!(agent.run("질문", QA_SYSTEM_PROMPT, &[]), FALLBACK_ANSWER);
        let inputs = script.inputs();
        assert_eq!(inputs.len(), 3);
        assert!(inputs[1].contains("Thought: (이곳에 질문에 대한 분석을 적거나 바로 답변하십시오.)"));
    }

    #[test]
    fn test_short_final_answer_on_mission_keeps_looping() {
        let script = Script::new(&["Final Answer: 없음", "Final Answer: 1) 돌봄 확대\n2) 인력 충원\n3) 시설 개선"]);
        let (agent, _) = agent_with(script.clone(), Ok("unused"));

        let outcome = agent.run_detailed(&policy_mission("강남구 정책"), "policy", &[]);
        assert_eq!(outcome.llm_calls, 2);
        assert!(outcome.answer.starts_with("1) 돌봄 확대"));
        assert!(script.inputs()[1]
            .contains("Thought: Final Answer: 없음\n시스템: 'Final Answer:' 뒤에 실질적이고"));
    }

    #[test]
    fn test_short_final_answer_at_cap_returns_fallback() {
        let script = Script::always("Final Answer: 네");
        let (agent, _) = agent_with(script.clone(), Ok("unused"));

        let outcome = agent.run_detailed(&policy_mission("정책"), "policy", &[]);
        assert!(outcome.is_exhausted());
        assert_eq!(outcome.llm_calls, 3);
    }

    #[test]
    fn test_empty_final_answer_on_ordinary_question_keeps_looping() {
        let script = Script::new(&["Final Answer:", "Final Answer: 운영비는 시설 규모에 따라 지원됩니다."]);
        let (agent, _) = agent_with(script, Ok("unused"));

        let outcome = agent.run_detailed("운영비 기준", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(outcome.llm_calls, 2);
        assert_eq!(outcome.answer, "운영비는 시설 규모에 따라 지원됩니다.");
    }

    #[test]
    fn test_fabricated_observation_is_truncated() {
        let script = Script::new(&["Thought: 안다\nFinal Answer: 돌봄 수요 증가\nObservation: fabricated"]);
        let (agent, _) = agent_with(script, Ok("unused"));

        assert_eq!(agent.run("질문", QA_SYSTEM_PROMPT, &[]), "돌봄 수요 증가");
    }

    #[test]
    fn test_implicit_answer_for_ordinary_question() {
        let script = Script::new(&["지역아동센터는 방과후 돌봄을 제공하는 시설입니다."]);
        let (agent, _) = agent_with(script, Ok("unused"));

        let outcome = agent.run_detailed("지역아동센터가 뭐야?", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(outcome.termination, Termination::ImplicitAnswer);
        assert_eq!(outcome.answer, "지역아동센터는 방과후 돌봄을 제공하는 시설입니다.");
    }

    #[test]
    fn test_mission_without_protocol_gets_corrective_note() {
        let script = Script::new(&[
            "데이터를 먼저 봐야 한다",
            "데이터를 먼저 봐야 한다 시스템: 무시",
            "데이터를 먼저 봐야 한다 시스템: 무시",
        ]);
        let (agent, _) = agent_with(script.clone(), Ok("unused"));

        let outcome = agent.run_detailed(&policy_mission("정책"), "policy", &[]);
        assert!(script.inputs()[1].contains("시스템: 다음 단계는 'Action: <도구명>'"));
        // last iteration: text before the system note is returned
        assert_eq!(outcome.termination, Termination::BestEffort);
        assert_eq!(outcome.answer, "데이터를 먼저 봐야 한다");
    }

    #[test]
    fn test_parse_failure_becomes_observation() {
        let script = Script::new(&[
            "Action: db_forecast_search\nAction Input: {\"district\": ",
            "Final Answer: 다시 시도했지만 데이터가 부족합니다.",
        ]);
        let (agent, calls) = agent_with(script.clone(), Ok("unused"));

        let outcome = agent.run_detailed("강남구 추세", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(outcome.steps[0].state, StepState::Malformed);
        assert!(calls.lock().unwrap().is_empty());
        assert!(script.inputs()[1].contains(
            "Observation: 오류 발생(Action Input에서 유효한 JSON 중괄호 블록을 찾을 수 없습니다.). 한 번에 하나의 Action만 JSON 형식으로 제출하십시오.\n"
        ));
    }

    #[test]
    fn test_transport_error_is_observed_as_text() {
        let script = Script::new(&[
            "Action: rag_search\nAction Input: {'question': '인건비'}",
            "Final Answer: 도구 오류로 지침을 확인하지 못했습니다.",
        ]);
        let (agent, calls) = agent_with(script.clone(), Err("connection refused"));

        agent.run("인건비", QA_SYSTEM_PROMPT, &[]);
        assert_eq!(calls.lock().unwrap()[0].1["question"], json!("인건비"));
        assert!(script.inputs()[1].contains("Observation: MCP 도구 호출 오류 (rag_search): "));
        assert!(script.inputs()[1].contains("connection refused"));
    }

    #[test]
    fn test_history_window_uses_most_recent_turns() {
        let script = Script::new(&["Final Answer: 네, 기억합니다."]);
        let (agent, _) = agent_with(script.clone(), Ok("unused"));
        let history: Vec<String> = (1..=6).map(|i| format!("Q: 질문{} / A: 답{}", i, i)).collect();

        agent.run("방금 뭐라고 했지?", QA_SYSTEM_PROMPT, &history);
        let input = &script.inputs()[0];
        assert!(input.starts_with("### 대화 기록 (History):\nQ: 질문3 / A: 답3\n"));
        assert!(!input.contains("질문2"));
        assert!(input.contains("Q: 질문6 / A: 답6\n\n사용자 질문: 방금 뭐라고 했지?\n"));
    }

    #[test]
    fn test_zero_iterations_is_rejected() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let transport = MockTransport {
            calls,
            reply: Ok(String::new()),
        };
        let result = ToolAgentBuilder::new(Script::new(&[]), ToolClient::new(Arc::new(transport)))
            .with_max_iterations(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_transcript_is_append_only() {
        let mut transcript = Transcript::start(&[], 4, "q");
        let before = transcript.len();
        transcript.push("\nObservation: x\n");
        assert!(transcript.len() > before);
        assert!(transcript.render().starts_with("사용자 질문: q\n"));
    }
}
