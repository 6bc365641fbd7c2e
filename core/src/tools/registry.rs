//! Tool registry for managing available tools

use crate::forecast::ForecastStore;
use crate::llm::LlmClient;
use crate::rag::ContextRetriever;
use crate::tools::{Tool, ToolCall, ToolDefinition, ToolExecutor};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collaborators shared by the built-in tools
#[derive(Clone)]
pub struct ToolContext {
    pub retriever: Arc<dyn ContextRetriever>,
    pub store: Arc<dyn ForecastStore>,
    pub generator: Arc<dyn LlmClient>,
}

/// Factory trait for creating tools
pub trait ToolFactory: Send + Sync {
    /// Create a new instance of the tool over the shared collaborators
    fn create(&self, ctx: &ToolContext) -> Box<dyn Tool>;

    /// Get the name of the tool this factory creates
    fn tool_name(&self) -> &str;

    /// Get the description of the tool this factory creates
    fn tool_description(&self) -> &str;
}

/// Registry of tool factories plus the executor built from them
pub struct ToolRegistry {
    factories: BTreeMap<String, Box<dyn ToolFactory>>,
    executor: ToolExecutor,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            executor: ToolExecutor::new(),
        }
    }

    /// Registry with all built-in tools wired to `ctx`
    pub fn with_context(ctx: &ToolContext) -> Self {
        let mut registry = Self::new();
        registry.register_factory(Box::new(crate::tools::builtin::RagSearchToolFactory), ctx);
        registry.register_factory(Box::new(crate::tools::builtin::ForecastSearchToolFactory), ctx);
        registry.register_factory(Box::new(crate::tools::builtin::ReportTaskToolFactory), ctx);
        registry.register_factory(Box::new(crate::tools::builtin::PolicyTaskToolFactory), ctx);
        registry.register_factory(Box::new(crate::tools::builtin::GenerateToolFactory), ctx);
        registry
    }

    /// Register a tool factory and instantiate its tool
    pub fn register_factory(&mut self, factory: Box<dyn ToolFactory>, ctx: &ToolContext) {
        self.executor.register_tool(factory.create(ctx));
        self.factories.insert(factory.tool_name().to_string(), factory);
    }

    /// List all available tool names, sorted
    pub fn list_tools(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Get tool information
    pub fn get_tool_info(&self, name: &str) -> Option<(&str, &str)> {
        self.factories
            .get(name)
            .map(|factory| (factory.tool_name(), factory.tool_description()))
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.executor.get_tool_definitions()
    }

    /// Invoke a tool and render the outcome as text.
    ///
    /// Returns the text and whether the call was rejected.
    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> (String, bool) {
        let result = self.executor.execute(ToolCall::new(name, arguments)).await;
        (result.content, !result.success)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Macro to help implement tool factories
#[macro_export]
macro_rules! impl_tool_factory {
    ($factory:ident, $tool:ident, $name:expr, $description:expr) => {
        pub struct $factory;

        impl $crate::tools::ToolFactory for $factory {
            fn create(&self, ctx: &$crate::tools::ToolContext) -> Box<dyn $crate::tools::Tool> {
                Box::new($tool::new(ctx))
            }

            fn tool_name(&self) -> &str {
                $name
            }

            fn tool_description(&self) -> &str {
                $description
            }
        }
    };
}
