//! Marker-based parsing of free-text model output
//!
//! A model turn is a "Thought: ..." block that may carry either a tool
//! invocation (`Action:` + `Action Input:` with one JSON object) or a
//! `Final Answer:`. Parsing is deliberately untyped: arguments stay raw JSON
//! because the text comes straight from the model and is often malformed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

pub const THOUGHT_MARKER: &str = "Thought:";
pub const ACTION_MARKER: &str = "Action:";
pub const ACTION_INPUT_MARKER: &str = "Action Input:";
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const OBSERVATION_MARKER: &str = "Observation:";
pub const SYSTEM_NOTE_MARKER: &str = "시스템:";

/// Markers that mean the model started inventing the next turn.
/// Applied in this order, each cutting the response at its first occurrence.
pub const STOP_MARKERS: [&str; 7] = [
    OBSERVATION_MARKER,
    "사용자 질문:",
    "질문:",
    "Q:",
    "A:",
    "### Input:",
    "###",
];

/// Errors raised while extracting a tool invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("응답에서 Action 도구명을 찾을 수 없습니다.")]
    MissingActionName,

    #[error("Action Input 항목을 찾을 수 없습니다.")]
    MissingActionInput,

    #[error("Action Input에서 유효한 JSON 중괄호 블록을 찾을 수 없습니다.")]
    UnbalancedJson,

    #[error("JSON 파싱 실패: {candidate}")]
    InvalidJson { candidate: String },
}

/// A tool name with its raw JSON arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Interpretation of one model turn
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedStep {
    FinalAnswer(String),
    ToolCall(ToolInvocation),
    Incomplete,
}

/// Named states of the step protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// Neither an action nor a final answer yet
    AwaitingStep,
    HaveAction,
    HaveFinalAnswer,
    /// An action marker was present but could not be parsed
    Malformed,
}

impl StepState {
    /// State reached after interpreting a turn
    pub fn of(step: &std::result::Result<ParsedStep, ParseError>) -> Self {
        match step {
            Ok(ParsedStep::FinalAnswer(_)) => StepState::HaveFinalAnswer,
            Ok(ParsedStep::ToolCall(_)) => StepState::HaveAction,
            Ok(ParsedStep::Incomplete) => StepState::AwaitingStep,
            Err(_) => StepState::Malformed,
        }
    }

    /// Classify a normalized and truncated response
    pub fn classify(response: &str) -> Self {
        Self::of(&interpret(response))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::AwaitingStep => "awaiting_step",
            StepState::HaveAction => "have_action",
            StepState::HaveFinalAnswer => "have_final_answer",
            StepState::Malformed => "malformed",
        }
    }
}

/// Trim the response and make sure it starts with a thought marker
pub fn normalize_response(raw: &str) -> String {
    if raw.trim_start().starts_with(THOUGHT_MARKER) {
        raw.trim().to_string()
    } else {
        format!("{} {}", THOUGHT_MARKER, raw.trim())
    }
}

/// Cut the response before any fabricated next turn
pub fn truncate_at_stop_markers(response: &str) -> String {
    let mut truncated = response.to_string();
    for marker in STOP_MARKERS {
        if let Some(pos) = truncated.find(marker) {
            truncated = truncated[..pos].trim().to_string();
        }
    }
    truncated
}

/// Response with every thought marker removed
pub fn strip_thought(response: &str) -> String {
    response.replace(THOUGHT_MARKER, "").trim().to_string()
}

/// Text between the first final-answer marker and the next one, trimmed
pub fn extract_final_answer(response: &str) -> Option<String> {
    let (_, rest) = response.split_once(FINAL_ANSWER_MARKER)?;
    let answer = match rest.find(FINAL_ANSWER_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(answer.trim().to_string())
}

/// Interpret a turn. A final answer wins over an action when both appear.
pub fn interpret(response: &str) -> std::result::Result<ParsedStep, ParseError> {
    if let Some(answer) = extract_final_answer(response) {
        return Ok(ParsedStep::FinalAnswer(answer));
    }
    if response.contains(ACTION_MARKER) {
        return parse_action(response).map(ParsedStep::ToolCall);
    }
    Ok(ParsedStep::Incomplete)
}

fn action_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"Action:\s*(\w+)").ok())
        .as_ref()
}

/// Extract the tool name and the first balanced JSON object after `Action Input:`
pub fn parse_action(response: &str) -> std::result::Result<ToolInvocation, ParseError> {
    let name = action_name_pattern()
        .and_then(|re| re.captures(response))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or(ParseError::MissingActionName)?;

    let (_, after_input) = response
        .split_once(ACTION_INPUT_MARKER)
        .ok_or(ParseError::MissingActionInput)?;
    // only up to a second Action Input, if the model emitted one
    let segment = match after_input.find(ACTION_INPUT_MARKER) {
        Some(end) => &after_input[..end],
        None => after_input,
    };

    let candidate = first_balanced_object(segment)
        .ok_or(ParseError::UnbalancedJson)?
        .trim();

    let candidate = if candidate.contains('\'') && !candidate.contains('"') {
        candidate.replace('\'', "\"")
    } else {
        candidate.to_string()
    };

    let arguments = serde_json::from_str::<Map<String, Value>>(&candidate)
        .map_err(|_| ParseError::InvalidJson { candidate })?;

    Ok(ToolInvocation { name, arguments })
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let mut depth: i64 = 0;
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
