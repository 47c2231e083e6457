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

//! Tabular reshaper: long observations to a wide table

use carbonwatch_types::format_api_datetime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::normalize::{Observation, normalize};
use crate::snapshot::Snapshot;
use crate::table::{ColumnKey, WideTable};

/// What to do when one snapshot supplies the same cell twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first value and log a warning
    #[default]
    KeepFirst,
    /// Reject the snapshot
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepFirst => f.write_str("keep_first"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "keep_first" => Ok(Self::KeepFirst),
            "reject" => Ok(Self::Reject),
            other => anyhow::bail!(
                "Unknown duplicate policy: '{other}'. Use 'keep_first' or 'reject'"
            ),
        }
    }
}

/// Column shape of the pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Columns keyed by (dimension, region, horizon)
    Horizon,
    /// Columns keyed by (dimension, region); one snapshot as a plain table
    Flat,
}

/// Pivot observations into a wide table
pub fn pivot<'a, I>(observations: I, shape: Shape, policy: DuplicatePolicy) -> Result<WideTable>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut table = WideTable::new();
    let mut duplicates = 0_usize;

    for obs in observations {
        let horizon = match shape {
            Shape::Horizon => Some(obs.horizon),
            Shape::Flat => None,
        };
        let key = ColumnKey::new(obs.dimension.clone(), obs.group.clone(), horizon);

        if table.contains(obs.timestamp, &key) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(CoreError::DuplicateCell {
                        timestamp: format_api_datetime(obs.timestamp),
                        column: key.to_string(),
                    });
                }
                DuplicatePolicy::KeepFirst => {
                    warn!(
                        "Duplicate value at {} in column {}, keeping the first",
                        format_api_datetime(obs.timestamp),
                        key
                    );
                    duplicates += 1;
                    continue;
                }
            }
        }
        table.set(obs.timestamp, key, obs.value.clone());
    }

    if duplicates > 0 {
        warn!("Ignored {duplicates} duplicate cells");
    }
    Ok(table)
}

/// One snapshot as a flat table indexed by `from`
pub fn flat_table(snapshot: &Snapshot, policy: DuplicatePolicy) -> Result<WideTable> {
    let observations = normalize(snapshot);
    pivot(&observations, Shape::Flat, policy)
}
