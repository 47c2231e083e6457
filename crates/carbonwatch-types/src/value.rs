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

use serde::{Deserialize, Serialize};
use std::fmt;

/// One table cell. Missing cells are not represented; tables are sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Intensity (gCO2/kWh) or fuel share (%)
    Number(f64),
    /// Categorical value such as the intensity index ("low", "moderate")
    Label(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Label(_) => None,
        }
    }

    /// Parse a CSV field. Empty fields are missing values.
    pub fn from_field(field: &str) -> Option<Self> {
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        match field.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(Self::Number(n)),
            _ => Some(Self::Label(field.to_owned())),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Label(value.to_owned())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_round_trip() {
        for value in [CellValue::Number(100.0), CellValue::Number(12.3), "moderate".into()] {
            assert_eq!(CellValue::from_field(&value.to_string()), Some(value));
        }
    }

    #[test]
    fn test_empty_field_is_missing() {
        assert_eq!(CellValue::from_field(""), None);
        assert_eq!(CellValue::from_field("   "), None);
    }

    #[test]
    fn test_nan_is_kept_as_label() {
        assert_eq!(CellValue::from_field("NaN"), Some("NaN".into()));
    }
}
