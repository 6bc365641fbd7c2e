//! Agent run result structures

use super::parser::StepState;
use serde::{Deserialize, Serialize};

/// Returned when the loop runs out of iterations
pub const FALLBACK_ANSWER: &str = "미안해, 답변을 생성하는 데 실패했어. 다시 한번 물어봐 줄래?";

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Explicit `Final Answer:` accepted
    FinalAnswer,
    /// Plain text accepted as an answer for an ordinary question
    ImplicitAnswer,
    /// Last iteration without action or final answer; text returned as is
    BestEffort,
    /// Iteration cap reached, fallback string returned
    Exhausted,
}

/// One iteration of the loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based iteration number
    pub iteration: usize,

    /// Normalized and truncated model output, empty when the model said nothing
    pub response: String,

    pub state: StepState,

    /// Tool invoked during this step
    pub tool: Option<String>,

    /// Text appended as the observation, including parse errors
    pub observation: Option<String>,

    pub duration_ms: u64,
}

impl StepRecord {
    pub fn new(iteration: usize, response: String, state: StepState) -> Self {
        Self {
            iteration,
            response,
            state,
            tool: None,
            observation: None,
            duration_ms: 0,
        }
    }
}

/// Result of one agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Answer handed back to the caller
    pub answer: String,

    /// Number of LLM callback invocations
    pub llm_calls: usize,

    pub termination: Termination,

    pub steps: Vec<StepRecord>,

    /// Total run time in milliseconds
    pub duration_ms: u64,
}

impl AgentOutcome {
    /// Number of tool invocations made during the run
    pub fn tool_calls(&self) -> usize {
        self.steps.iter().filter(|s| s.tool.is_some()).count()
    }

    /// Whether the run ended with the fallback string
    pub fn is_exhausted(&self) -> bool {
        self.termination == Termination::Exhausted
    }
}
