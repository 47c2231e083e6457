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

//! Half-hour time grid and forecast horizons.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Timestamp format used by the API, both in URLs and in payloads
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Same as [`DATETIME_FORMAT`] with the colon stripped, for file names
pub const FILENAME_DATETIME_FORMAT: &str = "%Y-%m-%dT%H%MZ";

/// Earliest timestamp the API has data for
pub const EARLIEST_DATE: &str = "2018-05-10T23:30Z";

/// Width of one grid slot
pub const GRID_MINUTES: i64 = 30;

const GRID_SECONDS: i64 = GRID_MINUTES * 60;

/// Round a timestamp down to the nearest grid boundary (XX:00 or XX:30).
///
/// Sub-second precision is dropped. Idempotent.
pub fn round_down(dt: DateTime<Utc>) -> DateTime<Utc> {
    let secs = dt.timestamp();
    let floored = secs - secs.rem_euclid(GRID_SECONDS);
    DateTime::from_timestamp(floored, 0).unwrap_or(dt)
}

/// Number of grid slots between two timestamps, truncated toward zero.
pub fn time_points_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start)
        .num_seconds()
        .checked_div(GRID_SECONDS)
        .unwrap_or_default()
}

/// Parse a timestamp in the API format (`2023-03-09T20:00Z`).
pub fn parse_api_datetime(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Invalid API timestamp: '{s}'"))
}

/// Format a timestamp in the API format.
pub fn format_api_datetime(dt: DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Lenient timestamp parser for user input.
///
/// Accepts the API format, RFC 3339, and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = parse_api_datetime(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }
    anyhow::bail!("Unrecognised timestamp '{s}', expected e.g. {EARLIEST_DATE}")
}

/// Signed offset between a data point's subject time and its snapshot's
/// capture time.
///
/// Ordering and equality are numeric. The textual form is fixed width: a sign
/// character followed by the absolute number of hours zero-padded to
/// `000.0`, e.g. `+005.5` and `-005.5`. Offsets of 1000 hours or more widen
/// the field. Offsets off the tenth-of-an-hour grid are written with six
/// decimals (`+000.250000`) so that parsing returns the same whole second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Horizon {
    seconds: i64,
}

/// Seconds in one displayed decimal of an hour
const TENTH_HOUR_SECONDS: i64 = 360;

impl Horizon {
    pub const ZERO: Self = Self { seconds: 0 };

    /// Horizon of `timestamp` as seen from a snapshot captured at `captured_at`
    pub fn between(captured_at: DateTime<Utc>, timestamp: DateTime<Utc>) -> Self {
        Self {
            seconds: (timestamp - captured_at).num_seconds(),
        }
    }

    pub fn from_hours(hours: f64) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "horizons are bounded by the API's 48h window"
        )]
        let seconds = (hours * 3600.0).round() as i64;
        Self { seconds }
    }

    pub fn hours(self) -> f64 {
        self.seconds as f64 / 3600.0
    }

    /// True for forecasts made before the time point they describe
    pub fn is_forecast(self) -> bool {
        self.seconds >= 0
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        if self.seconds.rem_euclid(TENTH_HOUR_SECONDS) == 0 {
            write!(f, "{sign}{:05.1}", self.hours().abs())
        } else {
            write!(f, "{sign}{:010.6}", self.hours().abs())
        }
    }
}

impl FromStr for Horizon {
    type Err = anyhow::Error;

    /// Accepts the fixed-width form as well as plain decimals (`-05.5`, `24`).
    fn from_str(s: &str) -> Result<Self> {
        let hours: f64 = s
            .trim()
            .parse()
            .with_context(|| format!("Invalid horizon: '{s}'"))?;
        if !hours.is_finite() {
            anyhow::bail!("Invalid horizon: '{s}'");
        }
        Ok(Self::from_hours(hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_round_down_datetime() {
        assert_eq!(round_down(utc(2022, 1, 1, 0, 15)), utc(2022, 1, 1, 0, 0));
        assert_eq!(round_down(utc(2022, 1, 1, 0, 45)), utc(2022, 1, 1, 0, 30));
        assert_eq!(round_down(utc(2022, 1, 1, 0, 30)), utc(2022, 1, 1, 0, 30));
    }

    #[test]
    fn test_round_down_drops_seconds() {
        let dt = Utc.with_ymd_and_hms(2023, 1, 1, 13, 31, 59).unwrap();
        assert_eq!(round_down(dt), utc(2023, 1, 1, 13, 30));
    }

    #[test]
    fn test_time_points_between() {
        assert_eq!(
            time_points_between(utc(2023, 1, 1, 0, 0), utc(2023, 1, 1, 1, 0)),
            2
        );
        // 59 minutes is one full slot plus change
        assert_eq!(
            time_points_between(utc(2023, 1, 1, 0, 0), utc(2023, 1, 1, 0, 59)),
            1
        );
        // Truncates toward zero when reversed
        assert_eq!(
            time_points_between(utc(2023, 1, 1, 0, 59), utc(2023, 1, 1, 0, 0)),
            -1
        );
    }

    #[test]
    fn test_parse_api_datetime() {
        let dt = parse_api_datetime("2021-01-01T01:00Z").unwrap();
        assert_eq!(dt, utc(2021, 1, 1, 1, 0));
        assert_eq!(format_api_datetime(dt), "2021-01-01T01:00Z");
        assert!(parse_api_datetime("2021-01-01 01:00").is_err());
    }

    #[test]
    fn test_parse_datetime_lenient() {
        assert_eq!(
            parse_datetime("2023-01-01T13:31Z").unwrap(),
            utc(2023, 1, 1, 13, 31)
        );
        assert_eq!(
            parse_datetime("2023-01-01T13:31:00+00:00").unwrap(),
            utc(2023, 1, 1, 13, 31)
        );
        assert_eq!(parse_datetime("2023-01-01").unwrap(), utc(2023, 1, 1, 0, 0));
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_horizon_between() {
        let captured = utc(2023, 3, 9, 20, 0);
        let h = Horizon::between(captured, captured + Duration::minutes(330));
        assert!((h.hours() - 5.5).abs() < f64::EPSILON);
        assert!(h.is_forecast());

        let past = Horizon::between(captured, captured - Duration::hours(24));
        assert!((past.hours() + 24.0).abs() < f64::EPSILON);
        assert!(!past.is_forecast());
        assert!(Horizon::ZERO.is_forecast());
    }

    #[test]
    fn test_horizon_format_differs_only_by_sign() {
        let plus = Horizon::from_hours(5.5).to_string();
        let minus = Horizon::from_hours(-5.5).to_string();
        assert_eq!(plus, "+005.5");
        assert_eq!(minus, "-005.5");
        assert_eq!(plus[1..], minus[1..]);
    }

    #[test]
    fn test_horizon_format_fixed_width() {
        for h in [-100.0, -24.0, -0.5, 0.0, 0.5, 24.0, 48.0, 100.0] {
            assert_eq!(Horizon::from_hours(h).to_string().len(), 6, "{h}");
        }
        assert_eq!(Horizon::from_hours(48.0).to_string(), "+048.0");
        assert_eq!(Horizon::from_hours(-24.0).to_string(), "-024.0");
        assert_eq!(Horizon::ZERO.to_string(), "+000.0");
    }

    #[test]
    fn test_horizon_sorting_between_minus_and_plus_hundred() {
        let hours: Vec<f64> = (-200..=200).map(|half| f64::from(half) / 2.0).collect();
        let horizons: Vec<Horizon> = hours.iter().map(|h| Horizon::from_hours(*h)).collect();

        // Numeric ordering survives a text round trip
        let mut parsed: Vec<Horizon> = horizons
            .iter()
            .rev()
            .map(|h| h.to_string().parse().unwrap())
            .collect();
        parsed.sort();
        assert_eq!(parsed, horizons);

        // Within one sign, text order equals magnitude order
        let positive: Vec<String> = horizons
            .iter()
            .filter(|h| h.is_forecast())
            .map(ToString::to_string)
            .collect();
        let mut sorted = positive.clone();
        sorted.sort();
        assert_eq!(sorted, positive);

        let negative: Vec<String> = horizons
            .iter()
            .rev()
            .filter(|h| !h.is_forecast())
            .map(ToString::to_string)
            .collect();
        let mut sorted = negative.clone();
        sorted.sort();
        assert_eq!(sorted, negative);
    }

    #[test]
    fn test_off_grid_horizon_keeps_its_seconds() {
        let captured = utc(2023, 3, 9, 20, 0);
        let quarter = Horizon::between(captured, utc(2023, 3, 9, 20, 15));
        assert_eq!(quarter.to_string(), "+000.250000");
        assert_eq!("+000.250000".parse::<Horizon>().unwrap(), quarter);
        assert_ne!(quarter, Horizon::from_hours(0.2));

        let odd = Horizon::between(captured, captured - Duration::seconds(7));
        assert_eq!(odd.to_string().parse::<Horizon>().unwrap(), odd);
        assert!(odd.to_string().starts_with('-'));
    }

    #[test]
    fn test_horizon_parses_legacy_zero_filled_strings() {
        assert_eq!("005.5".parse::<Horizon>().unwrap(), Horizon::from_hours(5.5));
        assert_eq!("-05.5".parse::<Horizon>().unwrap(), Horizon::from_hours(-5.5));
        assert_eq!("24".parse::<Horizon>().unwrap(), Horizon::from_hours(24.0));
        assert!("NaN".parse::<Horizon>().is_err());
        assert!("soon".parse::<Horizon>().is_err());
    }

    proptest! {
        #[test]
        fn prop_round_down_is_idempotent(secs in 1_500_000_000i64..2_000_000_000i64) {
            let dt = DateTime::from_timestamp(secs, 0).unwrap();
            let once = round_down(dt);
            prop_assert_eq!(round_down(once), once);
            prop_assert!(once <= dt);
            prop_assert!(dt - once < Duration::minutes(GRID_MINUTES));
        }

        #[test]
        fn prop_time_points_truncate(start in 1_500_000_000i64..1_600_000_000i64, span in 0i64..1_000_000i64) {
            let s = DateTime::from_timestamp(start, 0).unwrap();
            let e = DateTime::from_timestamp(start + span, 0).unwrap();
            prop_assert_eq!(time_points_between(s, e), span / GRID_SECONDS);
        }

        #[test]
        fn prop_horizon_text_round_trip(half_hours in -2000i64..2000i64) {
            let h = Horizon::between(
                DateTime::from_timestamp(0, 0).unwrap(),
                DateTime::from_timestamp(half_hours * GRID_SECONDS, 0).unwrap(),
            );
            prop_assert_eq!(h.to_string().parse::<Horizon>().unwrap(), h);
        }

        #[test]
        fn prop_horizon_text_round_trip_any_second(offset in -2_000_000i64..2_000_000i64) {
            let h = Horizon::between(
                DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
                DateTime::from_timestamp(1_600_000_000 + offset, 0).unwrap(),
            );
            prop_assert_eq!(h.to_string().parse::<Horizon>().unwrap(), h);
        }
    }
}
