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

//! Snapshots and the per-endpoint payload transforms
//!
//! A snapshot file is decoded into the typed API schema for its endpoint and
//! flattened into [`DataPoint`]s. Structural mismatches fail the whole file;
//! individual missing values are skipped with a warning.

use carbonwatch_types::{
    ApiResponse, CellValue, Endpoint, FuelShare, INTENSITY_ACTUAL, INTENSITY_FORECAST,
    INTENSITY_INDEX, Intensity, OneOrMany, Period, RegionSeries, Transform, round_down,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::captured_at_from_path;

/// One time-series point of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Raw `from` timestamp as sent by the API; parsed by the normalizer
    pub timestamp: String,
    /// Region id for payloads covering several regions
    pub group: Option<String>,
    pub values: BTreeMap<String, CellValue>,
}

impl DataPoint {
    fn new(timestamp: String, group: Option<String>) -> Self {
        Self {
            timestamp,
            group,
            values: BTreeMap::new(),
        }
    }
}

/// One fetched API document
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    pub points: Vec<DataPoint>,
}

impl Snapshot {
    /// `captured_at` is rounded down to the half-hour grid
    pub fn new(captured_at: DateTime<Utc>, points: Vec<DataPoint>) -> Self {
        Self {
            captured_at: round_down(captured_at),
            points,
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Load a snapshot file; the capture time comes from the file name
    pub fn load(path: &Path, endpoint: Endpoint) -> Result<Self> {
        let captured_at = captured_at_from_path(path)?;
        let points = read_points(path, endpoint.transform())?;
        debug!(
            "Loaded {} points from {} (captured {})",
            points.len(),
            path.display(),
            captured_at
        );
        Ok(Self::new(captured_at, points))
    }
}

/// Read and flatten a snapshot file without interpreting its name
pub fn read_points(path: &Path, transform: Transform) -> Result<Vec<DataPoint>> {
    let bytes = std::fs::read(path)?;
    extract_points(transform, &bytes)
}

/// Decode a payload with the schema of `transform` and flatten it
pub fn extract_points(transform: Transform, bytes: &[u8]) -> Result<Vec<DataPoint>> {
    match transform {
        Transform::National => {
            let response: ApiResponse<Vec<Period>> = serde_json::from_slice(bytes)?;
            Ok(national_points(response.data))
        }
        Transform::NationalGeneration => {
            let response: ApiResponse<Vec<Period>> = serde_json::from_slice(bytes)?;
            Ok(generation_points(response.data))
        }
        Transform::Regional => {
            let response: ApiResponse<Vec<Period>> = serde_json::from_slice(bytes)?;
            Ok(regional_points(response.data))
        }
        Transform::OneRegion => {
            let response: ApiResponse<OneOrMany<RegionSeries>> = serde_json::from_slice(bytes)?;
            Ok(one_region_points(response.data.into_vec()))
        }
    }
}

fn national_points(periods: Vec<Period>) -> Vec<DataPoint> {
    periods
        .into_iter()
        .filter_map(|period| {
            let from = period_start(&period)?;
            let mut point = DataPoint::new(from, None);
            match &period.intensity {
                Some(intensity) => insert_intensity(&mut point, intensity),
                None => warn!("Period {} has no intensity block", point.timestamp),
            }
            Some(point)
        })
        .collect()
}

fn generation_points(periods: Vec<Period>) -> Vec<DataPoint> {
    periods
        .into_iter()
        .filter_map(|period| {
            let from = period_start(&period)?;
            let mut point = DataPoint::new(from, None);
            insert_fuels(&mut point, &period.generationmix);
            Some(point)
        })
        .collect()
}

fn regional_points(periods: Vec<Period>) -> Vec<DataPoint> {
    let mut points = Vec::new();
    for period in periods {
        let Some(from) = period_start(&period) else {
            continue;
        };
        for region in period.regions {
            let Some(id) = region.regionid else {
                warn!("Region without id at {from}, skipped");
                continue;
            };
            let mut point = DataPoint::new(from.clone(), Some(id.to_string()));
            if let Some(intensity) = &region.intensity {
                insert_intensity(&mut point, intensity);
            }
            insert_fuels(&mut point, &region.generationmix);
            points.push(point);
        }
    }
    points
}

fn one_region_points(series: Vec<RegionSeries>) -> Vec<DataPoint> {
    let mut points = Vec::new();
    for region in series {
        let Some(id) = region.regionid else {
            warn!("Region series without id, skipped");
            continue;
        };
        let group = id.to_string();
        for period in region.data {
            let Some(from) = period_start(&period) else {
                continue;
            };
            let mut point = DataPoint::new(from, Some(group.clone()));
            if let Some(intensity) = &period.intensity {
                insert_intensity(&mut point, intensity);
            }
            insert_fuels(&mut point, &period.generationmix);
            points.push(point);
        }
    }
    points
}

fn period_start(period: &Period) -> Option<String> {
    if period.from.is_none() {
        warn!("Period without 'from' timestamp, skipped");
    }
    period.from.clone()
}

fn insert_intensity(point: &mut DataPoint, intensity: &Intensity) {
    if let Some(forecast) = intensity.forecast {
        point
            .values
            .insert(INTENSITY_FORECAST.to_owned(), CellValue::Number(forecast));
    }
    if let Some(actual) = intensity.actual {
        point
            .values
            .insert(INTENSITY_ACTUAL.to_owned(), CellValue::Number(actual));
    }
    if let Some(index) = &intensity.index {
        point
            .values
            .insert(INTENSITY_INDEX.to_owned(), CellValue::Label(index.clone()));
    }
}

fn insert_fuels(point: &mut DataPoint, mix: &[FuelShare]) {
    for share in mix {
        match share.perc {
            Some(perc) => {
                point
                    .values
                    .insert(share.fuel.clone(), CellValue::Number(perc));
            }
            None => warn!(
                "Fuel '{}' has no share at {}, skipped",
                share.fuel, point.timestamp
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonwatch_types::FUELS;
    use chrono::TimeZone;

    const NATIONAL: &str = r#"{"data":[
        {"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
         "intensity":{"forecast":186,"actual":null,"index":"moderate"}},
        {"from":"2023-03-09T20:30Z","to":"2023-03-09T21:00Z",
         "intensity":{"forecast":180,"actual":175,"index":"moderate"}}]}"#;

    const REGIONAL: &str = r#"{"data":[{"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
        "regions":[
          {"regionid":1,"shortname":"North Scotland","intensity":{"forecast":0,"index":"very low"},
           "generationmix":[{"fuel":"wind","perc":93.1},{"fuel":"hydro","perc":6.9}]},
          {"shortname":"No id","intensity":{"forecast":50,"index":"low"}},
          {"regionid":13,"shortname":"London","intensity":{"forecast":210,"index":"high"},
           "generationmix":[{"fuel":"gas","perc":null},{"fuel":"imports","perc":20.5}]}]}]}"#;

    #[test]
    fn test_national_points() {
        let points = extract_points(Transform::National, NATIONAL.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, "2023-03-09T20:00Z");
        assert_eq!(points[0].group, None);
        assert_eq!(
            points[0].values.get(INTENSITY_FORECAST),
            Some(&CellValue::Number(186.0))
        );
        assert!(!points[0].values.contains_key(INTENSITY_ACTUAL));
        assert_eq!(
            points[1].values.get(INTENSITY_ACTUAL),
            Some(&CellValue::Number(175.0))
        );
        assert_eq!(
            points[1].values.get(INTENSITY_INDEX),
            Some(&CellValue::Label("moderate".to_owned()))
        );
    }

    #[test]
    fn test_generation_points() {
        let json = r#"{"data":[{"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
            "generationmix":[{"fuel":"biomass","perc":5.1},{"fuel":"coal","perc":1.2}]}]}"#;
        let points = extract_points(Transform::NationalGeneration, json.as_bytes()).unwrap();
        assert_eq!(points.len(), 1);
        let keys: Vec<_> = points[0].values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["biomass", "coal"]);
        assert!(keys.iter().all(|k| FUELS.contains(k)));
    }

    #[test]
    fn test_regional_points_skip_missing() {
        let points = extract_points(Transform::Regional, REGIONAL.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].group.as_deref(), Some("1"));
        assert_eq!(points[1].group.as_deref(), Some("13"));
        assert_eq!(points[0].values.len(), 4);
        // null gas share is dropped, the rest of the region stays
        assert!(!points[1].values.contains_key("gas"));
        assert_eq!(
            points[1].values.get("imports"),
            Some(&CellValue::Number(20.5))
        );
    }

    #[test]
    fn test_one_region_points() {
        let json = r#"{"data":[{"regionid":13,"shortname":"London","data":[
            {"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
             "intensity":{"forecast":210,"index":"high"},
             "generationmix":[{"fuel":"gas","perc":40.0}]}]}]}"#;
        let points = extract_points(Transform::OneRegion, json.as_bytes()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].group.as_deref(), Some("13"));
        assert_eq!(points[0].values.get("gas"), Some(&CellValue::Number(40.0)));
    }

    #[test]
    fn test_wrong_shape_fails() {
        assert!(extract_points(Transform::National, b"{\"data\":{}}").is_err());
        assert!(extract_points(Transform::Regional, b"not json").is_err());
    }

    #[test]
    fn test_snapshot_rounds_capture_time() {
        let at = Utc.with_ymd_and_hms(2023, 3, 9, 20, 1, 0).unwrap();
        let snapshot = Snapshot::new(at, Vec::new());
        assert_eq!(
            snapshot.captured_at(),
            Utc.with_ymd_and_hms(2023, 3, 9, 20, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2023-03-09T2001Z.json");
        std::fs::write(&path, NATIONAL).unwrap();

        let snapshot = Snapshot::load(&path, Endpoint::NationalFw48h).unwrap();
        assert_eq!(snapshot.points.len(), 2);
        assert_eq!(
            snapshot.captured_at(),
            Utc.with_ymd_and_hms(2023, 3, 9, 20, 0, 0).unwrap()
        );
    }
}
