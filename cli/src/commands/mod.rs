//! CLI command implementations

pub mod ask;
pub mod chat;
pub mod forecast;
pub mod import;
pub mod model;
pub mod report;
pub mod serve;
pub mod tools;

pub use ask::ask_command;
pub use chat::chat_command;
pub use forecast::bound_forecasts_command;
pub use import::import_command;
pub use model::switch_model_command;
pub use report::{policy_command, report_command};
pub use serve::serve_command;
pub use tools::tools_command;

use anyhow::Result;
use taike_core::config::AppConfig;
use taike_core::GenAiService;
use tokio::runtime::Handle;

/// Build the service on the current runtime
fn open_service(config: AppConfig) -> Result<GenAiService> {
    Ok(GenAiService::new(config, Handle::current())?)
}
