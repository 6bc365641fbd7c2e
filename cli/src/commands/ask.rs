//! Single question command

use super::open_service;
use crate::output::{print_outcome, spinner};
use anyhow::Result;
use taike_core::config::AppConfig;
use tracing::info;

/// Answer one question with the QA agent
pub async fn ask_command(config: AppConfig, question: String, verbose: bool) -> Result<()> {
    info!("Answering question: {}", question);

    let mut service = open_service(config)?;
    let bar = spinner("답변 생성 중...");
    let outcome =
        tokio::task::spawn_blocking(move || service.answer_question(&question)).await??;
    bar.finish_and_clear();

    print_outcome(&outcome, verbose);
    Ok(())
}
