//! SQLite-backed statistics store

use super::{ForecastRow, ForecastStore, HistoryRow, YearlyTotal};
use crate::error::{ForecastError, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS region_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    district TEXT NOT NULL,
    year INTEGER NOT NULL,
    child_user REAL
);
CREATE TABLE IF NOT EXISTS region_forecast (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    district TEXT NOT NULL,
    year INTEGER NOT NULL,
    predicted_child_user REAL NOT NULL,
    model_version TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_region_forecast_district_year
    ON region_forecast (district, year);
";

/// Statistics store over a single SQLite connection
pub struct SqliteForecastStore {
    conn: Mutex<Connection>,
}

impl SqliteForecastStore {
    /// Open (and create if needed) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("🗄️ Opening statistics database: {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ForecastError::LockPoisoned.into())
    }
}

impl ForecastStore for SqliteForecastStore {
    fn yearly_totals(&self, start_year: i32, end_year: i32) -> Result<Vec<YearlyTotal>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT year, SUM(predicted_child_user) FROM region_forecast
             WHERE year >= ?1 AND year <= ?2
             GROUP BY year ORDER BY year ASC",
        )?;
        let rows = stmt.query_map(params![start_year, end_year], |row| {
            Ok(YearlyTotal {
                year: row.get(0)?,
                total: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn district_forecast(
        &self,
        district: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<ForecastRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT district, year, predicted_child_user, model_version FROM region_forecast
             WHERE district = ?1 AND year >= ?2 AND year <= ?3
             ORDER BY year ASC",
        )?;
        let rows = stmt.query_map(params![district, start_year, end_year], |row| {
            Ok(ForecastRow {
                district: row.get(0)?,
                year: row.get(1)?,
                predicted_child_user: row.get(2)?,
                model_version: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn history(&self, district: Option<&str>) -> Result<Vec<HistoryRow>> {
        let conn = self.lock()?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(HistoryRow {
                district: row.get(0)?,
                year: row.get(1)?,
                child_user: row.get(2)?,
            })
        };

        let rows = match district {
            Some(district) => {
                let mut stmt = conn.prepare(
                    "SELECT district, year, child_user FROM region_data
                     WHERE district = ?1 ORDER BY year ASC",
                )?;
                let rows = stmt.query_map(params![district], map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT district, year, child_user FROM region_data
                     ORDER BY district ASC, year ASC",
                )?;
                let rows = stmt.query_map([], map_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    fn replace_history(&self, rows: &[HistoryRow]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM region_data", [])?;
        info!("Deleted {} existing history rows", deleted);
        {
            let mut stmt = tx.prepare(
                "INSERT INTO region_data (district, year, child_user) VALUES (?1, ?2, ?3)",
            )?;
            for row in rows {
                stmt.execute(params![row.district, row.year, row.child_user])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn replace_future(&self, from_year: i32, rows: &[ForecastRow]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM region_forecast WHERE year >= ?1",
            params![from_year],
        )?;
        info!("Deleted {} existing forecast rows from {}", deleted, from_year);

        let created_at = chrono::Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO region_forecast
                 (district, year, predicted_child_user, model_version, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.district,
                    row.year,
                    row.predicted_child_user,
                    row.model_version,
                    created_at
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{forecast_context, ALL_DISTRICTS};

    fn forecast(district: &str, year: i32, value: f64) -> ForecastRow {
        ForecastRow {
            district: district.to_string(),
            year,
            predicted_child_user: value,
            model_version: Some("final".to_string()),
        }
    }

    fn seeded() -> SqliteForecastStore {
        let store = SqliteForecastStore::open_in_memory().unwrap();
        store
            .replace_future(
                2023,
                &[
                    forecast("강남구", 2024, 120.0),
                    forecast("강남구", 2023, 100.0),
                    forecast("종로구", 2023, 50.5),
                    forecast("종로구", 2031, 10.0),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_yearly_totals_sum_and_order() {
        let totals = seeded().yearly_totals(2023, 2030).unwrap();
        assert_eq!(
            totals,
            vec![
                YearlyTotal { year: 2023, total: 150.5 },
                YearlyTotal { year: 2024, total: 120.0 },
            ]
        );
    }

    #[test]
    fn test_district_forecast_filters_range() {
        let rows = seeded().district_forecast("강남구", 2023, 2023).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].predicted_child_user, 100.0);
        assert!(seeded().district_forecast("중구", 2023, 2030).unwrap().is_empty());
    }

    #[test]
    fn test_replace_future_deletes_previous_rows() {
        let store = seeded();
        store
            .replace_future(2024, &[forecast("강남구", 2025, 1.0)])
            .unwrap();
        let rows = store.district_forecast("강남구", 2000, 2100).unwrap();
        let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2023, 2025]);
    }

    #[test]
    fn test_history_round_trip() {
        let store = SqliteForecastStore::open_in_memory().unwrap();
        store
            .replace_history(&[
                HistoryRow { district: "강남구".into(), year: 2022, child_user: Some(80.0) },
                HistoryRow { district: "강남구".into(), year: 2017, child_user: None },
                HistoryRow { district: "중구".into(), year: 2022, child_user: Some(30.0) },
            ])
            .unwrap();

        let gangnam = store.history(Some("강남구")).unwrap();
        assert_eq!(gangnam.len(), 2);
        assert_eq!(gangnam[0].year, 2017);
        assert_eq!(gangnam[0].child_user, None);
        assert_eq!(store.history(None).unwrap().len(), 3);
    }

    #[test]
    fn test_replace_history_drops_previous_rows() {
        let store = SqliteForecastStore::open_in_memory().unwrap();
        let row = |district: &str, year| HistoryRow {
            district: district.into(),
            year,
            child_user: Some(10.0),
        };
        store.replace_history(&[row("중구", 2021), row("중구", 2022)]).unwrap();
        store.replace_history(&[row("강남구", 2022)]).unwrap();

        let rows = store.history(None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district, "강남구");
    }

    #[test]
    fn test_forecast_context() {
        let store = seeded();
        assert_eq!(
            forecast_context(&store, "강남구", 2023, 2030).unwrap(),
            "2023년: 100명\n2024년: 120명"
        );
        assert_eq!(
            forecast_context(&store, ALL_DISTRICTS, 2023, 2023).unwrap(),
            "2023년 합계: 150.5명"
        );
        assert_eq!(
            forecast_context(&store, "중구", 2023, 2030).unwrap(),
            "데이터 없음"
        );
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taike.db");
        let store = SqliteForecastStore::open(&path).unwrap();
        assert!(store.yearly_totals(2023, 2030).unwrap().is_empty());
        assert!(path.exists());
    }
}
