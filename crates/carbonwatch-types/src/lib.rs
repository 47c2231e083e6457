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

//! Shared types for CarbonWatch: the carbon-intensity API schema, the endpoint
//! catalogue, the half-hour time grid and the keys used by summary tables.

pub mod api;
pub mod endpoint;
pub mod time;
pub mod value;

// Re-export common types for convenience
pub use api::{ApiResponse, FuelShare, Intensity, OneOrMany, Period, RegionReading, RegionSeries};
pub use endpoint::{
    Endpoint, FUELS, HeaderLevel, INTENSITY_ACTUAL, INTENSITY_FORECAST, INTENSITY_INDEX, REGION_IDS,
    SummaryFormat, Transform,
};
pub use time::{
    DATETIME_FORMAT, EARLIEST_DATE, FILENAME_DATETIME_FORMAT, GRID_MINUTES, Horizon,
    format_api_datetime, parse_api_datetime, parse_datetime, round_down, time_points_between,
};
pub use value::CellValue;
