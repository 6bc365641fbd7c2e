//! Year-over-year and absolute bounding of raw model forecasts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::HistoryRow;

/// Limits applied to raw predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingPolicy {
    /// Lowest allowed ratio to the previous year
    pub min_ratio: f64,
    /// Highest allowed ratio to the previous year
    pub max_ratio: f64,
    /// Absolute cap as a multiple of the normal-window maximum
    pub abs_multiplier: f64,
    /// Fraction of the gap to the cap taken when the cap binds
    pub pull_fraction: f64,
    /// First year of the normal observation window
    pub normal_window_start: i32,
    /// Last observed year; its value seeds the recurrence
    pub last_history_year: i32,
}

impl Default for BoundingPolicy {
    fn default() -> Self {
        Self {
            min_ratio: 0.5,
            max_ratio: 2.0,
            abs_multiplier: 3.0,
            pull_fraction: 0.3,
            normal_window_start: 2017,
            last_history_year: 2022,
        }
    }
}

impl BoundingPolicy {
    /// Bound one value given the previous (already bounded) value
    pub fn bound_next(&self, prev: f64, abs_max: Option<f64>, raw: f64) -> f64 {
        let mut capped = if prev <= 0.0 {
            raw
        } else {
            let ratio = raw / prev;
            if ratio > self.max_ratio {
                prev * self.max_ratio
            } else if ratio < self.min_ratio {
                prev * self.min_ratio
            } else {
                raw
            }
        };

        if let Some(abs_max) = abs_max {
            if capped > abs_max {
                capped = prev + (abs_max - prev) * self.pull_fraction;
                if capped > abs_max {
                    capped = abs_max;
                }
            }
        }

        capped
    }

    /// Forward recurrence over a year-sorted series
    pub fn bound_series(&self, seed: f64, abs_max: Option<f64>, raw: &[f64]) -> Vec<f64> {
        let mut prev = seed;
        raw.iter()
            .map(|&value| {
                let bounded = self.bound_next(prev, abs_max, value);
                prev = bounded;
                bounded
            })
            .collect()
    }

    /// Absolute cap derived from a district's history
    pub fn absolute_cap(&self, history: &[HistoryRow]) -> Option<f64> {
        let window_max = max_child_user(history.iter().filter(|row| {
            row.year >= self.normal_window_start && row.year <= self.last_history_year
        }));
        window_max
            .or_else(|| max_child_user(history.iter()))
            .map(|max| max * self.abs_multiplier)
    }
}

fn max_child_user<'a, I: Iterator<Item = &'a HistoryRow>>(rows: I) -> Option<f64> {
    rows.filter_map(|row| row.child_user)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
}

/// Raw model output for one district and year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawForecast {
    pub district: String,
    pub year: i32,
    pub child_user_raw: f64,
}

/// Bounded forecast alongside its raw value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedForecast {
    pub district: String,
    pub year: i32,
    pub child_user_raw: f64,
    pub child_user: f64,
}

impl BoundedForecast {
    /// Whether bounding changed the raw value
    pub fn was_capped(&self) -> bool {
        self.child_user != self.child_user_raw
    }
}

/// Bound raw forecasts for every district, sorted by (district, year).
///
/// Districts without history or without a value for the last history year
/// keep their raw values.
pub fn bound_forecasts(
    policy: &BoundingPolicy,
    history: &[HistoryRow],
    raw: &[RawForecast],
) -> Vec<BoundedForecast> {
    let mut by_district: BTreeMap<&str, Vec<&RawForecast>> = BTreeMap::new();
    for row in raw {
        by_district.entry(row.district.as_str()).or_default().push(row);
    }

    let mut output = Vec::with_capacity(raw.len());
    for (district, mut rows) in by_district {
        rows.sort_by_key(|row| row.year);

        let mut hist: Vec<HistoryRow> = history
            .iter()
            .filter(|row| row.district == district && row.year <= policy.last_history_year)
            .cloned()
            .collect();
        hist.sort_by_key(|row| row.year);

        let seed = hist
            .iter()
            .find(|row| row.year == policy.last_history_year)
            .and_then(|row| row.child_user);

        let raw_values: Vec<f64> = rows.iter().map(|row| row.child_user_raw).collect();
        let bounded = match seed {
            Some(seed) => {
                let abs_max = policy.absolute_cap(&hist);
                debug!(
                    "Bounding {}: seed={}, abs_max={:?}",
                    district, seed, abs_max
                );
                policy.bound_series(seed, abs_max, &raw_values)
            }
            None => {
                debug!("Bounding {}: no seed value, keeping raw forecasts", district);
                raw_values.clone()
            }
        };

        output.extend(rows.iter().zip(bounded).map(|(row, value)| BoundedForecast {
            district: row.district.clone(),
            year: row.year,
            child_user_raw: row.child_user_raw,
            child_user: value,
        }));
    }

    output
}

/// Share of rows changed by bounding
pub fn capped_share(rows: &[BoundedForecast]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().filter(|row| row.was_capped()).count() as f64 / rows.len() as f64
}
