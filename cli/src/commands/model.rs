//! Generation model switching command

use crate::output::spinner;
use anyhow::{Context, Result};
use colored::Colorize;
use taike_core::config::AppConfig;
use taike_core::llm::HttpGenerateClient;

/// Ask the generation server to load another model version
pub async fn switch_model_command(config: AppConfig, model_version: String) -> Result<()> {
    let client = HttpGenerateClient::new(&config.generation)?;

    let bar = spinner("모델 전환 중...");
    let reply = client.switch_model(&model_version).await;
    bar.finish_and_clear();
    let reply = reply.with_context(|| format!("Failed to switch model to {}", model_version))?;

    println!("✅ Model switched to {}", model_version.bold());
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
