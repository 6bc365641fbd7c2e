//! Report and policy commands

use super::open_service;
use crate::output::{print_report, spinner};
use anyhow::Result;
use taike_core::config::AppConfig;
use tracing::info;

/// Write a district demand report
pub async fn report_command(
    config: AppConfig,
    district: String,
    start_year: i32,
    end_year: i32,
) -> Result<()> {
    info!("Report for {} {}~{}", district, start_year, end_year);

    let service = open_service(config)?;
    let bar = spinner("보고서 작성 중...");
    let report = tokio::task::spawn_blocking(move || {
        service.generate_report(&district, start_year, end_year)
    })
    .await??;
    bar.finish_and_clear();

    print_report(&report);
    Ok(())
}

/// Propose district policies for a request
pub async fn policy_command(config: AppConfig, prompt: String) -> Result<()> {
    info!("Policy request: {}", prompt);

    let service = open_service(config)?;
    let bar = spinner("정책 제안 작성 중...");
    let answer = tokio::task::spawn_blocking(move || service.generate_policy(&prompt)).await??;
    bar.finish_and_clear();

    println!("{}", answer);
    Ok(())
}
