//! Forecast statistics lookup tool

use crate::error::Result;
use crate::forecast::{format_count, ForecastStore, ALL_DISTRICTS};
use crate::impl_tool_factory;
use crate::tools::{Tool, ToolContext, ToolExample, ToolRequest};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Looks up predicted child-center users per district and year
pub struct ForecastSearchTool {
    store: Arc<dyn ForecastStore>,
}

impl ForecastSearchTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            store: ctx.store.clone(),
        }
    }

    fn search(&self, district: &str, start_year: i32, end_year: i32) -> Result<String> {
        if district == ALL_DISTRICTS {
            let totals = self.store.yearly_totals(start_year, end_year)?;
            if totals.is_empty() {
                return Ok(format!(
                    "{}~{} 기간의 전체 데이터가 없습니다.",
                    start_year, end_year
                ));
            }
            return Ok(totals
                .iter()
                .map(|t| format!("{}년 서울시 전체 합계: {}명", t.year, format_count(t.total)))
                .collect::<Vec<_>>()
                .join("\n"));
        }

        let rows = self.store.district_forecast(district, start_year, end_year)?;
        if rows.is_empty() {
            return Ok(format!(
                "{}의 {}~{} 기간 데이터가 없습니다.",
                district, start_year, end_year
            ));
        }

        let mut lines = vec![format!("{} 예측 데이터:", district)];
        lines.extend(
            rows.iter()
                .map(|r| format!("- {}년: {}명", r.year, format_count(r.predicted_child_user))),
        );
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Tool for ForecastSearchTool {
    fn name(&self) -> &str {
        "db_forecast_search"
    }

    fn description(&self) -> &str {
        "서울시 구별 아동 인구 예측 데이터를 조회합니다. \
         district는 구 이름(예: '강남구', '종로구'), 전체 합계는 '전체'입니다."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "district": {
                    "type": "string",
                    "description": "구 이름 (예: '강남구'. 전체 합계는 '전체')",
                    "default": "전체"
                },
                "start_year": {
                    "type": "integer",
                    "description": "시작 연도",
                    "default": 2023
                },
                "end_year": {
                    "type": "integer",
                    "description": "종료 연도",
                    "default": 2030
                }
            }
        })
    }

    async fn execute(&self, request: ToolRequest) -> Result<String> {
        let (district, start_year, end_year) = match request {
            ToolRequest::DbForecastSearch {
                district,
                start_year,
                end_year,
            } => (district, start_year, end_year),
            other => return Err(other.mismatch(self.name())),
        };

        match self.search(&district, start_year, end_year) {
            Ok(text) => Ok(text),
            Err(e) => {
                error!("Forecast lookup failed: {}", e);
                Ok(format!("DB 조회 중 오류 발생: {}", e))
            }
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![
            ToolExample {
                description: "강남구 예측치 조회".to_string(),
                parameters: json!({"district": "강남구", "start_year": 2025, "end_year": 2027}),
                expected_result: "연도별 예측 인원 목록".to_string(),
            },
            ToolExample {
                description: "서울시 전체 연도별 합계".to_string(),
                parameters: json!({"district": "전체"}),
                expected_result: "연도별 합계".to_string(),
            },
        ]
    }
}

impl_tool_factory!(
    ForecastSearchToolFactory,
    ForecastSearchTool,
    "db_forecast_search",
    "Look up district forecasts of child-center users"
);
