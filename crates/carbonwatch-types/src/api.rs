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

//! Response schema of api.carbonintensity.org.uk
//!
//! Structure is validated here; individual fields that the API sometimes omits
//! or nulls are optional so that one missing value never rejects a whole
//! snapshot. Timestamps stay as strings and are parsed per point downstream.

use serde::{Deserialize, Serialize};

/// Every endpoint wraps its payload in `{"data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// The one-region endpoints have been seen returning both an object and a
/// single-element list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intensity {
    /// Forecast intensity (gCO2/kWh)
    #[serde(default)]
    pub forecast: Option<f64>,
    /// Measured intensity, only present for past periods on national endpoints
    #[serde(default)]
    pub actual: Option<f64>,
    /// Categorical band: "very low", "low", "moderate", "high", "very high"
    #[serde(default)]
    pub index: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelShare {
    pub fuel: String,
    #[serde(default)]
    pub perc: Option<f64>,
}

/// One half-hour period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub intensity: Option<Intensity>,
    #[serde(default)]
    pub generationmix: Vec<FuelShare>,
    #[serde(default)]
    pub regions: Vec<RegionReading>,
}

/// One region's values inside a regional period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionReading {
    #[serde(default)]
    pub regionid: Option<u32>,
    #[serde(default)]
    pub dnoregion: Option<String>,
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(default)]
    pub intensity: Option<Intensity>,
    #[serde(default)]
    pub generationmix: Vec<FuelShare>,
}

/// Payload of the one-region endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionSeries {
    #[serde(default)]
    pub regionid: Option<u32>,
    #[serde(default)]
    pub dnoregion: Option<String>,
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(default)]
    pub data: Vec<Period>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_payload() {
        let json = r#"{"data":[{"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
            "intensity":{"forecast":186,"actual":190,"index":"moderate"}}]}"#;
        let parsed: ApiResponse<Vec<Period>> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 1);
        let intensity = parsed.data[0].intensity.clone().unwrap();
        assert_eq!(intensity.forecast, Some(186.0));
        assert_eq!(intensity.actual, Some(190.0));
        assert_eq!(intensity.index.as_deref(), Some("moderate"));
    }

    #[test]
    fn test_null_actual_is_missing() {
        let json = r#"{"data":[{"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
            "intensity":{"forecast":186,"actual":null,"index":"moderate"}}]}"#;
        let parsed: ApiResponse<Vec<Period>> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].intensity.as_ref().unwrap().actual, None);
    }

    #[test]
    fn test_regional_payload() {
        let json = r#"{"data":[{"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
            "regions":[{"regionid":1,"dnoregion":"Scottish Hydro Electric Power Distribution",
            "shortname":"North Scotland","intensity":{"forecast":0,"index":"very low"},
            "generationmix":[{"fuel":"wind","perc":93.1},{"fuel":"hydro","perc":6.9}]}]}]}"#;
        let parsed: ApiResponse<Vec<Period>> = serde_json::from_str(json).unwrap();
        let region = &parsed.data[0].regions[0];
        assert_eq!(region.regionid, Some(1));
        assert_eq!(region.generationmix.len(), 2);
        assert_eq!(region.generationmix[0].perc, Some(93.1));
    }

    #[test]
    fn test_one_region_payload_object_or_list() {
        let object = r#"{"data":{"regionid":13,"shortname":"London","data":[]}}"#;
        let list = r#"{"data":[{"regionid":13,"shortname":"London","data":[]}]}"#;
        for json in [object, list] {
            let parsed: ApiResponse<OneOrMany<RegionSeries>> = serde_json::from_str(json).unwrap();
            let series = parsed.data.into_vec();
            assert_eq!(series.len(), 1);
            assert_eq!(series[0].regionid, Some(13));
        }
    }

    #[test]
    fn test_wrong_structure_is_rejected() {
        let json = r#"{"data":"not a list"}"#;
        assert!(serde_json::from_str::<ApiResponse<Vec<Period>>>(json).is_err());
        assert!(serde_json::from_str::<ApiResponse<Vec<Period>>>(r#"{"error":{}}"#).is_err());
    }
}
