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

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::time::format_api_datetime;

/// GB DNO region ids served by the regional endpoints
pub const REGION_IDS: RangeInclusive<u8> = 1..=18;

/// Fuel categories reported in the generation mix
pub const FUELS: [&str; 9] = [
    "biomass", "coal", "gas", "hydro", "imports", "nuclear", "other", "solar", "wind",
];

pub const INTENSITY_FORECAST: &str = "intensity.forecast";
pub const INTENSITY_ACTUAL: &str = "intensity.actual";
pub const INTENSITY_INDEX: &str = "intensity.index";

// ============= Endpoints =============

/// Carbon-intensity API endpoints CarbonWatch knows how to fetch and reshape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Single half hour, national
    National,
    /// National forecast 48h forward
    NationalFw48h,
    /// National forecast and actual 24h back
    NationalPt24h,
    /// National generation mix 24h back
    NationalGenerationPt24h,
    /// All regions, 48h forward
    RegionalFw48h,
    /// All regions, 24h back
    RegionalPt24h,
    /// One region, 48h forward
    OneRegionFw48h,
    /// One region, 24h back
    OneRegionPt24h,
}

impl Endpoint {
    /// Identifier used on the command line and in summary file names
    pub fn id(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::NationalFw48h => "national_fw48h",
            Self::NationalPt24h => "national_pt24h",
            Self::NationalGenerationPt24h => "national_generation_pt24h",
            Self::RegionalFw48h => "regional_fw48h",
            Self::RegionalPt24h => "regional_pt24h",
            Self::OneRegionFw48h => "one_region_fw48h",
            Self::OneRegionPt24h => "one_region_pt24h",
        }
    }

    /// Path relative to the API base URL. `{from}` and `{region}` are placeholders.
    pub fn path_template(&self) -> &'static str {
        match self {
            Self::National => "/intensity/{from}",
            Self::NationalFw48h => "/intensity/{from}/fw48h",
            Self::NationalPt24h => "/intensity/{from}/pt24h",
            Self::NationalGenerationPt24h => "/generation/{from}/pt24h",
            Self::RegionalFw48h => "/regional/intensity/{from}/fw48h",
            Self::RegionalPt24h => "/regional/intensity/{from}/pt24h",
            Self::OneRegionFw48h => "/regional/intensity/{from}/fw48h/regionid/{region}",
            Self::OneRegionPt24h => "/regional/intensity/{from}/pt24h/regionid/{region}",
        }
    }

    pub fn requires_region(&self) -> bool {
        matches!(self, Self::OneRegionFw48h | Self::OneRegionPt24h)
    }

    /// Build the request URL for a snapshot at `from`
    pub fn url(&self, base_url: &str, from: DateTime<Utc>, region: Option<u8>) -> Result<String> {
        let mut path = self
            .path_template()
            .replace("{from}", &format_api_datetime(from));

        if self.requires_region() {
            let region = region.ok_or_else(|| {
                anyhow::anyhow!("Endpoint '{}' requires a region id", self.id())
            })?;
            if !REGION_IDS.contains(&region) {
                anyhow::bail!(
                    "Region id {region} out of range {}..={}",
                    REGION_IDS.start(),
                    REGION_IDS.end()
                );
            }
            path = path.replace("{region}", &region.to_string());
        }

        Ok(format!("{}{path}", base_url.trim_end_matches('/')))
    }

    /// Which reshaping variant understands this endpoint's payload
    pub fn transform(&self) -> Transform {
        match self {
            Self::National | Self::NationalFw48h | Self::NationalPt24h => Transform::National,
            Self::NationalGenerationPt24h => Transform::NationalGeneration,
            Self::RegionalFw48h | Self::RegionalPt24h => Transform::Regional,
            Self::OneRegionFw48h | Self::OneRegionPt24h => Transform::OneRegion,
        }
    }

    pub fn summary_format(&self) -> SummaryFormat {
        match self.transform() {
            Transform::National => SummaryFormat::National,
            Transform::NationalGeneration => SummaryFormat::Generation,
            Transform::Regional | Transform::OneRegion => SummaryFormat::Regional,
        }
    }

    pub fn all() -> &'static [Endpoint] {
        &[
            Self::National,
            Self::NationalFw48h,
            Self::NationalPt24h,
            Self::NationalGenerationPt24h,
            Self::RegionalFw48h,
            Self::RegionalPt24h,
            Self::OneRegionFw48h,
            Self::OneRegionPt24h,
        ]
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|e| e.id() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown endpoint: '{}'. Supported endpoints: {}",
                    s,
                    Self::all()
                        .iter()
                        .map(Endpoint::id)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

// ============= Payload shapes =============

/// Payload shapes, one per family of endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// `data: [{from, to, intensity}]`
    National,
    /// `data: [{from, to, generationmix}]`
    NationalGeneration,
    /// `data: [{from, to, regions: [{regionid, intensity, generationmix}]}]`
    Regional,
    /// `data: {regionid, data: [{from, to, intensity, generationmix}]}`
    OneRegion,
}

// ============= Summary formats =============

/// One row of a summary file's multi-row header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderLevel {
    Dimension,
    Region,
    Horizon,
}

impl HeaderLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dimension => "dimension",
            Self::Region => "region",
            Self::Horizon => "horizon",
        }
    }
}

/// Column layout of a persisted summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFormat {
    National,
    Generation,
    Regional,
}

impl SummaryFormat {
    /// Dimensions accumulated into the summary; anything else is dropped
    pub fn value_dimensions(&self) -> Vec<&'static str> {
        match self {
            Self::National => vec![INTENSITY_FORECAST, INTENSITY_ACTUAL],
            Self::Generation => FUELS.to_vec(),
            Self::Regional => std::iter::once(INTENSITY_FORECAST)
                .chain(FUELS.iter().copied())
                .collect(),
        }
    }

    pub fn header_levels(&self) -> &'static [HeaderLevel] {
        match self {
            Self::National | Self::Generation => &[HeaderLevel::Dimension, HeaderLevel::Horizon],
            Self::Regional => &[
                HeaderLevel::Dimension,
                HeaderLevel::Region,
                HeaderLevel::Horizon,
            ],
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.header_levels().contains(&HeaderLevel::Region)
    }
}
