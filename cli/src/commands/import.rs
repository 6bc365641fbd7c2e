//! Statistics import command

use super::open_service;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use taike_core::config::AppConfig;
use taike_core::forecast::{ForecastRow, HistoryRow};
use tracing::info;

async fn read_rows<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<Vec<T>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}: {}", kind, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}: {}", kind, path.display()))
}

/// Replace stored history and/or predictions with rows from JSON files
pub async fn import_command(
    config: AppConfig,
    history: Option<PathBuf>,
    forecasts: Option<PathBuf>,
) -> Result<()> {
    if history.is_none() && forecasts.is_none() {
        bail!("Nothing to import: pass --history and/or --forecasts");
    }

    let history_rows: Option<Vec<HistoryRow>> = match &history {
        Some(path) => Some(read_rows(path, "history").await?),
        None => None,
    };
    let forecast_rows: Option<Vec<ForecastRow>> = match &forecasts {
        Some(path) => Some(read_rows(path, "forecasts").await?),
        None => None,
    };

    let service = open_service(config)?;
    let (history_written, forecasts_written) = tokio::task::spawn_blocking(move || {
        let history_written = history_rows
            .map(|rows| service.import_history(&rows))
            .transpose()?;
        let forecasts_written = forecast_rows
            .map(|rows| service.import_forecasts(&rows))
            .transpose()?;
        Ok::<_, taike_core::Error>((history_written, forecasts_written))
    })
    .await??;

    if let Some(count) = history_written {
        info!("History replaced");
        println!("📥 {} history row(s) imported", count);
    }
    if let Some(count) = forecasts_written {
        info!("Forecasts replaced");
        println!("📥 {} forecast row(s) imported", count);
    }
    Ok(())
}
