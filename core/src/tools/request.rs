//! Typed requests for the fixed tool set

use crate::error::{Result, ToolError};
use crate::forecast::{ALL_DISTRICTS, FIRST_FORECAST_YEAR, LAST_FORECAST_YEAR};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RAG_SEARCH: &str = "rag_search";
pub const DB_FORECAST_SEARCH: &str = "db_forecast_search";
pub const CREATE_REPORT_TASK: &str = "create_report_task";
pub const CREATE_POLICY_TASK: &str = "create_policy_task";
pub const LLAMA_GENERATE: &str = "llama_generate";

/// Every tool name the server knows
pub const TOOL_NAMES: [&str; 5] = [
    RAG_SEARCH,
    DB_FORECAST_SEARCH,
    CREATE_REPORT_TASK,
    CREATE_POLICY_TASK,
    LLAMA_GENERATE,
];

/// A validated tool request, one variant per tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolRequest {
    RagSearch {
        // the prompts' own example uses "query"
        #[serde(alias = "query")]
        question: String,
    },
    DbForecastSearch {
        #[serde(default = "default_district")]
        district: String,
        #[serde(default = "default_start_year")]
        start_year: i32,
        #[serde(default = "default_end_year")]
        end_year: i32,
    },
    CreateReportTask {
        data_context: String,
        district: String,
    },
    CreatePolicyTask {
        data_context: String,
        district: String,
    },
    LlamaGenerate {
        instruction: String,
        input_text: String,
        #[serde(default = "default_model_version")]
        model_version: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
        #[serde(default = "default_max_new_tokens")]
        max_new_tokens: u32,
        #[serde(default = "default_timeout_connect")]
        timeout_connect: f64,
        #[serde(default = "default_timeout_read")]
        timeout_read: f64,
    },
}

fn default_district() -> String {
    ALL_DISTRICTS.to_string()
}

fn default_start_year() -> i32 {
    FIRST_FORECAST_YEAR
}

fn default_end_year() -> i32 {
    LAST_FORECAST_YEAR
}

fn default_model_version() -> String {
    "final".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_new_tokens() -> u32 {
    512
}

fn default_timeout_connect() -> f64 {
    10.0
}

fn default_timeout_read() -> f64 {
    180.0
}

impl ToolRequest {
    /// Validate a raw argument map against the named tool
    pub fn from_call(name: &str, arguments: &Map<String, Value>) -> Result<Self> {
        if !TOOL_NAMES.contains(&name) {
            return Err(ToolError::NotFound {
                name: name.to_string(),
            }
            .into());
        }

        let mut tagged = arguments.clone();
        tagged.insert("tool".to_string(), Value::String(name.to_string()));

        serde_json::from_value(Value::Object(tagged)).map_err(|e| {
            ToolError::InvalidParameters {
                message: format!("{}: {}", name, e),
            }
            .into()
        })
    }

    /// Name of the tool this request is addressed to
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRequest::RagSearch { .. } => RAG_SEARCH,
            ToolRequest::DbForecastSearch { .. } => DB_FORECAST_SEARCH,
            ToolRequest::CreateReportTask { .. } => CREATE_REPORT_TASK,
            ToolRequest::CreatePolicyTask { .. } => CREATE_POLICY_TASK,
            ToolRequest::LlamaGenerate { .. } => LLAMA_GENERATE,
        }
    }

    /// Error for a request delivered to the wrong tool
    pub(crate) fn mismatch(&self, tool: &str) -> crate::error::Error {
        ToolError::InvalidParameters {
            message: format!("{} cannot handle a {} request", tool, self.tool_name()),
        }
        .into()
    }
}
