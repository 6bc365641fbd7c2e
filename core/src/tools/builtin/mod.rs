//! Built-in tools

pub mod forecast_search;
pub mod generate;
pub mod rag_search;
pub mod tasks;

pub use forecast_search::{ForecastSearchTool, ForecastSearchToolFactory};
pub use generate::{GenerateTool, GenerateToolFactory};
pub use rag_search::{RagSearchTool, RagSearchToolFactory};
pub use tasks::{PolicyTaskTool, PolicyTaskToolFactory, ReportTaskTool, ReportTaskToolFactory};
