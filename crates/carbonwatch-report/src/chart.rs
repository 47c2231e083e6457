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

use carbonwatch_core::WideTable;
use carbonwatch_types::{Horizon, INTENSITY_FORECAST};
use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use std::fmt::Display;

use crate::distribution::{ErrorDistribution, Histogram};
use crate::error::{ReportError, Result};
use crate::stats::{as_f64, final_actuals};

/// Hours before the last time point whose actuals are assumed incomplete
pub const DEFAULT_INCOMPLETE_HOURS_OFFSET: i64 = 72;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

const PALETTE: [RGBColor; 6] = [
    RGBColor(33, 150, 243),
    RGBColor(255, 152, 0),
    RGBColor(156, 39, 176),
    RGBColor(0, 150, 136),
    RGBColor(233, 30, 99),
    RGBColor(121, 85, 72),
];
const ACTUAL_COLOR: RGBColor = RGBColor(26, 26, 26);
const CURVE_POINTS: usize = 200;

fn chart_err(e: impl Display) -> ReportError {
    ReportError::Chart(e.to_string())
}

/// Time span shown on a forecast chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ChartWindow {
    pub fn starting_at(start: DateTime<Utc>, hours: i64) -> Self {
        Self {
            start,
            end: start + Duration::hours(hours),
        }
    }

    /// Latest window whose actuals are complete.
    ///
    /// Actuals keep being revised for a while, so the window ends
    /// `incomplete_hours_offset` hours before the table's last time point.
    pub fn latest_complete(
        table: &WideTable,
        hours: i64,
        incomplete_hours_offset: i64,
    ) -> Result<Self> {
        let (Some(first), Some(last)) = (table.first_timestamp(), table.last_timestamp()) else {
            return Err(ReportError::NotEnoughData("summary is empty".to_owned()));
        };
        let end = last - Duration::hours(incomplete_hours_offset);
        if end < first {
            return Err(ReportError::NotEnoughData(format!(
                "summary spans {first} to {last}, less than the {incomplete_hours_offset}h needed for complete actuals"
            )));
        }
        Ok(Self {
            start: (end - Duration::hours(hours)).max(first),
            end,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Lines of a forecast-vs-actual chart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    pub forecasts: Vec<(Horizon, Vec<(DateTime<Utc>, f64)>)>,
    pub actual: Vec<(DateTime<Utc>, f64)>,
}

impl ForecastSeries {
    pub fn is_empty(&self) -> bool {
        self.actual.is_empty() && self.forecasts.iter().all(|(_, points)| points.is_empty())
    }

    fn points(&self) -> impl Iterator<Item = &(DateTime<Utc>, f64)> {
        self.actual
            .iter()
            .chain(self.forecasts.iter().flat_map(|(_, points)| points.iter()))
    }
}

/// Forecasts at `horizons` and the final actual, inside `window`
pub fn forecast_series(
    table: &WideTable,
    group: Option<&str>,
    horizons: &[Horizon],
    window: ChartWindow,
) -> ForecastSeries {
    let actual = final_actuals(table, group)
        .into_iter()
        .filter(|(ts, _)| window.contains(*ts))
        .collect();

    let forecasts = horizons
        .iter()
        .map(|horizon| {
            let points = table
                .columns()
                .find(|k| {
                    k.dimension == INTENSITY_FORECAST
                        && k.group.as_deref() == group
                        && k.horizon == Some(*horizon)
                })
                .and_then(|key| table.column(key))
                .map(|cells| {
                    cells
                        .iter()
                        .filter(|(ts, _)| window.contains(**ts))
                        .filter_map(|(ts, value)| value.as_number().map(|v| (*ts, v)))
                        .collect()
                })
                .unwrap_or_default();
            (*horizon, points)
        })
        .collect();

    ForecastSeries { forecasts, actual }
}

fn padded_range(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span <= 0.0 {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - span * 0.1, hi + span * 0.1)
}

/// Render forecasts and final actual over time as SVG
pub fn forecast_chart_svg(
    series: &ForecastSeries,
    window: ChartWindow,
    title: &str,
    width: u32,
    height: u32,
) -> Result<String> {
    if series.is_empty() {
        return Err(ReportError::NotEnoughData(format!(
            "no values between {} and {}",
            window.start, window.end
        )));
    }

    let lo = series.points().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let hi = series
        .points()
        .map(|(_, v)| *v)
        .fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = padded_range(lo.min(0.0), hi);

    let mut svg_data = String::new();
    {
        let root = SVGBackend::with_string(&mut svg_data, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(window.start..window.end, y_min..y_max)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Time (UTC)")
            .y_desc("Carbon intensity (gCO2/kWh)")
            .x_labels(12)
            .y_labels(10)
            .x_label_formatter(&|dt| dt.format("%m-%d %H:%M").to_string())
            .draw()
            .map_err(chart_err)?;

        for ((horizon, points), color) in series.forecasts.iter().zip(PALETTE.iter().cycle()) {
            let color = *color;
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
                .map_err(chart_err)?
                .label(format!("forecast {horizon}h"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .draw_series(LineSeries::new(
                series.actual.iter().copied(),
                ACTUAL_COLOR.stroke_width(2),
            ))
            .map_err(chart_err)?
            .label("final actual")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ACTUAL_COLOR));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg_data)
}

/// Render the error histogram with fitted density curves as SVG
pub fn histogram_svg(
    distribution: &ErrorDistribution,
    bins: usize,
    title: &str,
    width: u32,
    height: u32,
) -> Result<String> {
    let histogram = Histogram::new(&distribution.values, bins)?;
    let bars = histogram.density_bins();
    let (x_min, x_max) = (histogram.start, histogram.end());

    let step = (x_max - x_min) / as_f64(CURVE_POINTS - 1);
    let curves: Vec<(String, Vec<(f64, f64)>)> = distribution
        .fits
        .iter()
        .map(|fit| {
            let points = (0..CURVE_POINTS)
                .map(|i| {
                    let x = x_min + step * as_f64(i);
                    (x, fit.pdf(x))
                })
                .collect();
            (fit.kind.to_string(), points)
        })
        .collect();

    let y_max = bars
        .iter()
        .map(|(_, _, d)| *d)
        .chain(curves.iter().flat_map(|(_, pts)| pts.iter().map(|(_, y)| *y)))
        .filter(|y| y.is_finite())
        .fold(0.0_f64, f64::max)
        * 1.1;

    let mut svg_data = String::new();
    {
        let root = SVGBackend::with_string(&mut svg_data, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max.max(f64::EPSILON))
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Forecast error (gCO2/kWh)")
            .y_desc("Density")
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(bars.iter().map(|(lo, hi, density)| {
                Rectangle::new([(*lo, 0.0), (*hi, *density)], PALETTE[0].mix(0.4).filled())
            }))
            .map_err(chart_err)?;

        for ((name, points), color) in curves.iter().zip(PALETTE.iter().skip(1).cycle()) {
            let color = *color;
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
                .map_err(chart_err)?
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::fit_errors;
    use carbonwatch_core::ColumnKey;
    use carbonwatch_types::INTENSITY_ACTUAL;
    use chrono::TimeZone;

    fn ts(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn table_spanning(hours: i64) -> WideTable {
        let mut table = WideTable::new();
        let forecast = ColumnKey::new(INTENSITY_FORECAST, None, Some(Horizon::from_hours(1.0)));
        let actual = ColumnKey::new(INTENSITY_ACTUAL, None, Some(Horizon::from_hours(-24.0)));
        for h in 0..=hours {
            #[expect(clippy::cast_precision_loss, reason = "small test values")]
            let value = 150.0 + (h as f64).sin() * 20.0;
            table.set(ts(h), forecast.clone(), (value + 5.0).into());
            table.set(ts(h), actual.clone(), value.into());
        }
        table
    }

    #[test]
    fn test_latest_complete_window() {
        let table = table_spanning(120);
        let window = ChartWindow::latest_complete(&table, 24, 72).unwrap();
        assert_eq!(window.end, ts(48));
        assert_eq!(window.start, ts(24));
    }

    #[test]
    fn test_window_needs_enough_data() {
        let table = table_spanning(48);
        assert!(matches!(
            ChartWindow::latest_complete(&table, 24, 72),
            Err(ReportError::NotEnoughData(_))
        ));
        assert!(ChartWindow::latest_complete(&WideTable::new(), 24, 72).is_err());
    }

    #[test]
    fn test_forecast_series_filters_window() {
        let table = table_spanning(120);
        let window = ChartWindow::starting_at(ts(10), 5);
        let series = forecast_series(
            &table,
            None,
            &[Horizon::from_hours(1.0), Horizon::from_hours(6.0)],
            window,
        );
        assert_eq!(series.actual.len(), 6);
        assert_eq!(series.forecasts[0].1.len(), 6);
        assert!(series.forecasts[1].1.is_empty());
    }

    #[test]
    fn test_forecast_chart_renders_svg() {
        let table = table_spanning(120);
        let window = ChartWindow::latest_complete(&table, 24, 72).unwrap();
        let series = forecast_series(&table, None, &[Horizon::from_hours(1.0)], window);
        let svg = forecast_chart_svg(&series, window, "national_fw48h", 800, 400).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("final actual"));
    }

    #[test]
    fn test_empty_series_is_error() {
        let window = ChartWindow::starting_at(ts(0), 24);
        let err = forecast_chart_svg(&ForecastSeries::default(), window, "t", 800, 400);
        assert!(err.is_err());
    }

    #[test]
    fn test_histogram_renders_svg() {
        let errors: Vec<f64> = (-30..=30).map(f64::from).collect();
        let distribution = fit_errors(&errors, 200.0).unwrap();
        let svg = histogram_svg(&distribution, 10, "errors", 800, 400).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Laplace"));
    }
}
