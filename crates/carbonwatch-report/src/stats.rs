// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of CarbonWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Forecast accuracy statistics over a national summary table
//!
//! The "final actual" of a time point is the `intensity.actual` value seen at
//! the most negative horizon, i.e. the last revision the API published. Each
//! forecast is compared against it.

use carbonwatch_core::{ColumnKey, WideTable};
use carbonwatch_types::{Horizon, INTENSITY_ACTUAL, INTENSITY_FORECAST};
use chrono::{DateTime, Utc};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;

use crate::error::{ReportError, Result};

/// Confidence levels reported for every horizon
pub const CONFIDENCE_LEVELS: [f64; 2] = [0.95, 0.99];

#[expect(
    clippy::cast_precision_loss,
    reason = "sample sizes never approach 2^52"
)]
pub(crate) fn as_f64(n: usize) -> f64 {
    n as f64
}

/// One forecast compared against the final actual of its time point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorPoint {
    pub timestamp: DateTime<Utc>,
    pub forecast: f64,
    pub actual: f64,
}

impl ErrorPoint {
    /// Positive when the forecast overshot
    pub fn error(&self) -> f64 {
        self.forecast - self.actual
    }
}

fn matches_group(key: &ColumnKey, group: Option<&str>) -> bool {
    key.group.as_deref() == group
}

/// Final actual per time point
pub fn final_actuals(table: &WideTable, group: Option<&str>) -> BTreeMap<DateTime<Utc>, f64> {
    let mut columns: Vec<&ColumnKey> = table
        .columns()
        .filter(|k| k.dimension == INTENSITY_ACTUAL && matches_group(k, group))
        .collect();
    columns.sort_by_key(|k| k.horizon);

    let mut actuals = BTreeMap::new();
    for key in columns {
        let Some(cells) = table.column(key) else {
            continue;
        };
        for (ts, value) in cells {
            if let Some(actual) = value.as_number() {
                actuals.entry(*ts).or_insert(actual);
            }
        }
    }
    actuals
}

/// Forecasts paired with final actuals, grouped by horizon
pub fn forecast_errors(
    table: &WideTable,
    group: Option<&str>,
) -> BTreeMap<Horizon, Vec<ErrorPoint>> {
    let actuals = final_actuals(table, group);
    let mut errors: BTreeMap<Horizon, Vec<ErrorPoint>> = BTreeMap::new();

    for key in table
        .columns()
        .filter(|k| k.dimension == INTENSITY_FORECAST && matches_group(k, group))
    {
        let (Some(horizon), Some(cells)) = (key.horizon, table.column(key)) else {
            continue;
        };
        for (ts, value) in cells {
            if let Some(forecast) = value.as_number()
                && let Some(actual) = actuals.get(ts)
            {
                errors.entry(horizon).or_default().push(ErrorPoint {
                    timestamp: *ts,
                    forecast,
                    actual: *actual,
                });
            }
        }
    }
    errors
}

/// Count, mean, sample standard deviation and range of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Describe the finite values of a sample; `None` when there are none
pub fn describe(values: &[f64]) -> Option<Descriptive> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let n = as_f64(finite.len());
    let mean = finite.iter().sum::<f64>() / n;
    let std_dev = if finite.len() < 2 {
        0.0
    } else {
        (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    };

    Some(Descriptive {
        count: finite.len(),
        mean,
        std_dev,
        min: finite.iter().copied().fold(f64::INFINITY, f64::min),
        max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Student-t confidence interval of the mean; `None` below two points
pub fn confidence_interval(values: &[f64], level: f64) -> Option<(f64, f64)> {
    let stats = describe(values)?;
    if stats.count < 2 || !(0.0..1.0).contains(&level) {
        return None;
    }
    let sem = stats.std_dev / as_f64(stats.count).sqrt();
    let t = StudentsT::new(0.0, 1.0, as_f64(stats.count - 1)).ok()?;
    let critical = t.inverse_cdf((1.0 + level) / 2.0);
    Some((stats.mean - critical * sem, stats.mean + critical * sem))
}

/// Error statistics for one horizon
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonStats {
    pub horizon: Horizon,
    pub stats: Descriptive,
    pub ci95: Option<(f64, f64)>,
    pub ci99: Option<(f64, f64)>,
}

/// Per-horizon error statistics, ordered by horizon
pub fn horizon_stats(errors: &BTreeMap<Horizon, Vec<ErrorPoint>>) -> Result<Vec<HorizonStats>> {
    let rows: Vec<HorizonStats> = errors
        .iter()
        .filter_map(|(horizon, points)| {
            let values: Vec<f64> = points.iter().map(ErrorPoint::error).collect();
            let stats = describe(&values)?;
            let [level95, level99] = CONFIDENCE_LEVELS;
            Some(HorizonStats {
                horizon: *horizon,
                stats,
                ci95: confidence_interval(&values, level95),
                ci99: confidence_interval(&values, level99),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(ReportError::NotEnoughData(
            "no forecast has a matching final actual".to_owned(),
        ));
    }
    Ok(rows)
}

/// Every error across the selected horizons
pub fn pooled_errors(
    errors: &BTreeMap<Horizon, Vec<ErrorPoint>>,
    horizons: Option<&[Horizon]>,
) -> Vec<f64> {
    errors
        .iter()
        .filter(|(h, _)| horizons.is_none_or(|wanted| wanted.contains(*h)))
        .flat_map(|(_, points)| points.iter().map(ErrorPoint::error))
        .collect()
}
