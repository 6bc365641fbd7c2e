//! Agent configuration structures

use super::ToolAgent;
use crate::config::AgentSettings;
use crate::error::{AgentError, Result};
use crate::llm::LlmCallback;
use crate::mcp::ToolClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for a [`ToolAgent`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of LLM calls per run
    pub max_iterations: usize,

    /// Number of prior turns included as context
    pub history_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            history_window: 4,
        }
    }
}

impl From<&AgentSettings> for AgentConfig {
    fn from(settings: &AgentSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            history_window: settings.history_window,
        }
    }
}

/// Builder for creating agents over an LLM callback and a tool client
pub struct ToolAgentBuilder {
    llm: Arc<dyn LlmCallback>,
    tool_client: ToolClient,
    agent_config: AgentConfig,
}

impl ToolAgentBuilder {
    pub fn new(llm: Arc<dyn LlmCallback>, tool_client: ToolClient) -> Self {
        Self {
            llm,
            tool_client,
            agent_config: AgentConfig::default(),
        }
    }

    /// Set agent configuration
    pub fn with_agent_config(mut self, agent_config: AgentConfig) -> Self {
        self.agent_config = agent_config;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.agent_config.max_iterations = max_iterations;
        self
    }

    /// Set how many prior turns are used as context
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.agent_config.history_window = history_window;
        self
    }

    /// Build the agent, rejecting a zero iteration cap
    pub fn build(self) -> Result<ToolAgent> {
        if self.agent_config.max_iterations == 0 {
            return Err(AgentError::NoIterations.into());
        }
        Ok(ToolAgent::new(self.llm, self.tool_client, self.agent_config))
    }
}
