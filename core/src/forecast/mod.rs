//! Historical and forecast child-welfare statistics per district and year

pub mod bounding;
pub mod store;

pub use bounding::{bound_forecasts, capped_share, BoundedForecast, BoundingPolicy, RawForecast};
pub use store::SqliteForecastStore;

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// District name meaning "all of Seoul"
pub const ALL_DISTRICTS: &str = "전체";

/// First predicted year
pub const FIRST_FORECAST_YEAR: i32 = 2023;

/// Last predicted year
pub const LAST_FORECAST_YEAR: i32 = 2030;

/// The 25 Seoul districts in canonical order
pub const SEOUL_DISTRICTS: [&str; 25] = [
    "종로구", "중구", "용산구", "성동구", "광진구", "동대문구", "중랑구", "성북구", "강북구",
    "도봉구", "노원구", "은평구", "서대문구", "마포구", "양천구", "강서구", "구로구", "금천구",
    "영등포구", "동작구", "관악구", "서초구", "강남구", "송파구", "강동구",
];

/// First district mentioned in the text, or [`ALL_DISTRICTS`]
pub fn district_from_text(text: &str) -> &'static str {
    SEOUL_DISTRICTS
        .iter()
        .find(|district| text.contains(*district))
        .copied()
        .unwrap_or(ALL_DISTRICTS)
}

/// Observed child-center users for one district and year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub district: String,
    pub year: i32,
    pub child_user: Option<f64>,
}

/// Predicted child-center users for one district and year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub district: String,
    pub year: i32,
    #[serde(alias = "child_user")]
    pub predicted_child_user: f64,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// City-wide total for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyTotal {
    pub year: i32,
    pub total: f64,
}

/// Read/write access to the statistics database
pub trait ForecastStore: Send + Sync {
    /// Sum of predictions per year within `[start_year, end_year]`, ascending
    fn yearly_totals(&self, start_year: i32, end_year: i32) -> Result<Vec<YearlyTotal>>;

    /// Predictions for one district within `[start_year, end_year]`, ascending
    fn district_forecast(
        &self,
        district: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<ForecastRow>>;

    /// All observed rows, optionally restricted to one district
    fn history(&self, district: Option<&str>) -> Result<Vec<HistoryRow>>;

    /// Replace every observed row with `rows`, atomically
    fn replace_history(&self, rows: &[HistoryRow]) -> Result<usize>;

    /// Delete predictions from `from_year` on and insert `rows`, atomically
    fn replace_future(&self, from_year: i32, rows: &[ForecastRow]) -> Result<usize>;
}

/// Reject rows a store must not hold: blank districts and non-finite counts
pub fn check_history(rows: &[HistoryRow]) -> Result<()> {
    for row in rows {
        check_row(&row.district, row.year, row.child_user)?;
    }
    Ok(())
}

/// Forecast counterpart of [`check_history`]
pub fn check_forecasts(rows: &[ForecastRow]) -> Result<()> {
    for row in rows {
        check_row(&row.district, row.year, Some(row.predicted_child_user))?;
    }
    Ok(())
}

fn check_row(district: &str, year: i32, value: Option<f64>) -> Result<()> {
    if district.trim().is_empty() {
        return Err(ForecastError::InvalidInput {
            message: format!("row for {} has no district", year),
        }
        .into());
    }
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ForecastError::InvalidInput {
            message: format!("{} {}: count {} is not a non-negative number", district, year, v),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Render a head count without a trailing `.0`
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Forecast lines used as report context, or "데이터 없음"
pub fn forecast_context(
    store: &dyn ForecastStore,
    district: &str,
    start_year: i32,
    end_year: i32,
) -> Result<String> {
    let lines: Vec<String> = if district == ALL_DISTRICTS {
        store
            .yearly_totals(start_year, end_year)?
            .iter()
            .map(|t| format!("{}년 합계: {}명", t.year, format_count(t.total)))
            .collect()
    } else {
        store
            .district_forecast(district, start_year, end_year)?
            .iter()
            .map(|r| format!("{}년: {}명", r.year, format_count(r.predicted_child_user)))
            .collect()
    };

    if lines.is_empty() {
        Ok("데이터 없음".to_string())
    } else {
        Ok(lines.join("\n"))
    }
}
