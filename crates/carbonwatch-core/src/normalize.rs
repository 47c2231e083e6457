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

//! Horizon normalizer: puts every snapshot value on the (time, horizon) axes

use carbonwatch_types::{CellValue, Horizon, parse_api_datetime};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::snapshot::Snapshot;

/// One value of a snapshot in long form
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub horizon: Horizon,
    pub group: Option<String>,
    pub dimension: String,
    pub value: CellValue,
}

/// Flatten a snapshot into observations.
///
/// Points whose timestamp doesn't parse are dropped with a warning.
pub fn normalize(snapshot: &Snapshot) -> Vec<Observation> {
    let captured_at = snapshot.captured_at();
    let mut observations = Vec::new();
    let mut dropped = 0_usize;

    for point in &snapshot.points {
        let timestamp = match parse_api_datetime(&point.timestamp) {
            Ok(ts) => ts,
            Err(e) => {
                warn!("Dropping point: {e}");
                dropped += 1;
                continue;
            }
        };
        let horizon = Horizon::between(captured_at, timestamp);

        observations.extend(point.values.iter().map(|(dimension, value)| Observation {
            timestamp,
            horizon,
            group: point.group.clone(),
            dimension: dimension.clone(),
            value: value.clone(),
        }));
    }

    if dropped > 0 {
        warn!(
            "Dropped {dropped} of {} points of snapshot {captured_at}",
            snapshot.points.len()
        );
    }
    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DataPoint;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn point(timestamp: &str, forecast: f64) -> DataPoint {
        DataPoint {
            timestamp: timestamp.to_owned(),
            group: None,
            values: BTreeMap::from([(
                "intensity.forecast".to_owned(),
                CellValue::Number(forecast),
            )]),
        }
    }

    #[test]
    fn test_horizons_relative_to_rounded_capture() {
        let captured = Utc.with_ymd_and_hms(2023, 3, 9, 20, 1, 0).unwrap();
        let snapshot = Snapshot::new(
            captured,
            vec![
                point("2023-03-09T14:30Z", 150.0),
                point("2023-03-09T20:00Z", 186.0),
                point("2023-03-10T01:30Z", 120.0),
            ],
        );

        let horizons: Vec<String> = normalize(&snapshot)
            .iter()
            .map(|o| o.horizon.to_string())
            .collect();
        assert_eq!(horizons, vec!["-005.5", "+000.0", "+005.5"]);
    }

    #[test]
    fn test_bad_timestamp_dropped() {
        let captured = Utc.with_ymd_and_hms(2023, 3, 9, 20, 0, 0).unwrap();
        let snapshot = Snapshot::new(
            captured,
            vec![point("yesterday", 1.0), point("2023-03-09T20:30Z", 2.0)],
        );

        let observations = normalize(&snapshot);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].value, CellValue::Number(2.0));
        assert!(observations[0].horizon.is_forecast());
    }
}
