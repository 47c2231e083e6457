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

//! Summary accumulator
//!
//! A summary is an explicit value: [`merge`] takes it by value together with a
//! reshaped snapshot and returns the updated summary. Persistence lives in
//! [`crate::csv_io`].

use carbonwatch_types::SummaryFormat;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::Result;
use crate::normalize::{Observation, normalize};
use crate::reshape::{DuplicatePolicy, Shape, pivot};
use crate::snapshot::Snapshot;
use crate::table::WideTable;

/// Long-lived table of every (time, column) value seen for one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    format: SummaryFormat,
    table: WideTable,
}

impl SummaryTable {
    pub fn empty(format: SummaryFormat) -> Self {
        Self::from_table(format, WideTable::new())
    }

    pub fn from_table(format: SummaryFormat, table: WideTable) -> Self {
        Self { format, table }
    }

    pub fn format(&self) -> SummaryFormat {
        self.format
    }

    pub fn table(&self) -> &WideTable {
        &self.table
    }

    pub fn into_table(self) -> WideTable {
        self.table
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Reshape a snapshot into the column space of a summary format.
///
/// Dimensions the format doesn't track are dropped. In single-entity formats
/// the region key is dropped; in grouped formats points without a region are
/// skipped.
pub fn snapshot_table(
    snapshot: &Snapshot,
    format: SummaryFormat,
    policy: DuplicatePolicy,
) -> Result<WideTable> {
    let wanted = format.value_dimensions();
    let grouped = format.is_grouped();
    let mut seen = BTreeSet::new();
    let mut ungrouped = 0_usize;

    let observations = normalize(snapshot);
    let rows: BTreeSet<_> = observations.iter().map(|obs| obs.timestamp).collect();

    let observations: Vec<Observation> = observations
        .into_iter()
        .filter(|obs| wanted.contains(&obs.dimension.as_str()))
        .filter_map(|mut obs| {
            if grouped {
                if obs.group.is_none() {
                    ungrouped += 1;
                    return None;
                }
            } else {
                obs.group = None;
            }
            seen.insert(obs.dimension.clone());
            Some(obs)
        })
        .collect();

    if ungrouped > 0 {
        warn!("Skipped {ungrouped} values without a region in a regional summary");
    }
    for dimension in wanted.iter().filter(|d| !seen.contains(**d)) {
        debug!(
            "Dimension '{dimension}' absent from snapshot {}",
            snapshot.captured_at()
        );
    }

    let mut table = pivot(&observations, Shape::Horizon, policy)?;
    // Timestamps whose values were all filtered out still extend the index
    for timestamp in rows {
        table.insert_row(timestamp);
    }
    Ok(table)
}

/// Merge `update` into `summary`.
///
/// The row index becomes the union of both. Every populated cell of `update`
/// overwrites or fills the summary; cells and columns it doesn't populate are
/// left untouched. Idempotent.
pub fn merge(summary: SummaryTable, update: &WideTable) -> SummaryTable {
    let SummaryTable { format, mut table } = summary;

    for timestamp in update.row_index() {
        table.insert_row(timestamp);
    }
    for key in update.columns() {
        table.insert_column(key.clone());
    }
    for (key, timestamp, value) in update.cells() {
        table.set(timestamp, key.clone(), value.clone());
    }

    SummaryTable { format, table }
}
