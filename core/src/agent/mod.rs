//! Tool-calling agent: parser, loop, prompts and short-term memory

pub mod config;
pub mod execution;
pub mod memory;
pub mod parser;
pub mod prompt;
pub mod tool_agent;

pub use config::{AgentConfig, ToolAgentBuilder};
pub use execution::{AgentOutcome, StepRecord, Termination, FALLBACK_ANSWER};
pub use memory::ConversationMemory;
pub use parser::{parse_action, ParseError, ParsedStep, StepState, ToolInvocation};
pub use prompt::{is_mission, POLICY_SYSTEM_PROMPT, QA_SYSTEM_PROMPT, REPORT_SYSTEM_PROMPT};
pub use tool_agent::{ToolAgent, Transcript};
