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

//! Forecast accuracy reports over national summary tables: per-horizon
//! error statistics, error distribution fits and SVG charts.

pub mod chart;
pub mod distribution;
pub mod error;
pub mod formatters;
pub mod stats;

pub use chart::{
    ChartWindow, DEFAULT_INCOMPLETE_HOURS_OFFSET, DEFAULT_WINDOW_HOURS, ForecastSeries,
    forecast_chart_svg, forecast_series, histogram_svg,
};
pub use distribution::{DistributionFit, ErrorDistribution, FitKind, Histogram, fit_errors};
pub use error::{ReportError, Result};
pub use formatters::{CsvFormatter, TableFormatter};
pub use stats::{
    CONFIDENCE_LEVELS, Descriptive, ErrorPoint, HorizonStats, confidence_interval, describe,
    final_actuals, forecast_errors, horizon_stats, pooled_errors,
};
