//! Forecast bounding command

use super::open_service;
use crate::output::print_bounded;
use anyhow::{Context, Result};
use std::path::PathBuf;
use taike_core::config::AppConfig;
use taike_core::forecast::{capped_share, RawForecast};
use tracing::info;

/// Bound raw predictions from a JSON file and store them unless `dry_run`
pub async fn bound_forecasts_command(
    config: AppConfig,
    input: PathBuf,
    model_version: String,
    dry_run: bool,
) -> Result<()> {
    let content = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("Failed to read predictions: {}", input.display()))?;
    let raw: Vec<RawForecast> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse predictions: {}", input.display()))?;
    info!("Loaded {} raw prediction(s)", raw.len());

    let service = open_service(config)?;
    let bounded = tokio::task::spawn_blocking(move || {
        service.rebound_forecasts(&raw, &model_version, dry_run)
    })
    .await??;

    print_bounded(&bounded, capped_share(&bounded));
    if dry_run {
        println!("dry run: nothing was written");
    }
    Ok(())
}
