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

//! Sparse wide table indexed by timestamp and keyed by composite columns

use carbonwatch_types::{CellValue, Horizon};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Composite column key: (dimension, optional region, optional horizon)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub dimension: String,
    pub group: Option<String>,
    pub horizon: Option<Horizon>,
}

impl ColumnKey {
    pub fn new(dimension: impl Into<String>, group: Option<String>, horizon: Option<Horizon>) -> Self {
        Self {
            dimension: dimension.into(),
            group,
            horizon,
        }
    }

    pub fn flat(dimension: impl Into<String>, group: Option<String>) -> Self {
        Self::new(dimension, group, None)
    }
}

/// Region ids are compared numerically so that region 2 precedes region 10
fn compare_groups(a: Option<&String>, b: Option<&String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.parse::<u32>(), b.parse::<u32>()) {
            (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            _ => a.cmp(b),
        },
        (a, b) => a.cmp(&b),
    }
}

impl Ord for ColumnKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dimension
            .cmp(&other.dimension)
            .then_with(|| compare_groups(self.group.as_ref(), other.group.as_ref()))
            .then_with(|| self.horizon.cmp(&other.horizon))
    }
}

impl PartialOrd for ColumnKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dimension)?;
        if let Some(group) = &self.group {
            write!(f, "/{group}")?;
        }
        if let Some(horizon) = &self.horizon {
            write!(f, "/{horizon}")?;
        }
        Ok(())
    }
}

/// Column-oriented sparse table.
///
/// Missing cells are simply absent. The row index is kept separately so that
/// a timestamp stays in the table even when none of its cells are populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    rows: BTreeSet<DateTime<Utc>>,
    columns: BTreeMap<ColumnKey, BTreeMap<DateTime<Utc>, CellValue>>,
}

impl WideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_row(&mut self, timestamp: DateTime<Utc>) {
        self.rows.insert(timestamp);
    }

    /// Register a column without populating any cell
    pub fn insert_column(&mut self, key: ColumnKey) {
        self.columns.entry(key).or_default();
    }

    /// Set a cell, returning the value it replaced
    pub fn set(
        &mut self,
        timestamp: DateTime<Utc>,
        key: ColumnKey,
        value: CellValue,
    ) -> Option<CellValue> {
        self.rows.insert(timestamp);
        self.columns.entry(key).or_default().insert(timestamp, value)
    }

    pub fn get(&self, timestamp: DateTime<Utc>, key: &ColumnKey) -> Option<&CellValue> {
        self.columns.get(key)?.get(&timestamp)
    }

    pub fn contains(&self, timestamp: DateTime<Utc>, key: &ColumnKey) -> bool {
        self.get(timestamp, key).is_some()
    }

    /// Timestamps in ascending order
    pub fn row_index(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.rows.iter().copied()
    }

    /// Column keys in display order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.keys()
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&BTreeMap<DateTime<Utc>, CellValue>> {
        self.columns.get(key)
    }

    /// Every populated cell, column by column
    pub fn cells(&self) -> impl Iterator<Item = (&ColumnKey, DateTime<Utc>, &CellValue)> {
        self.columns
            .iter()
            .flat_map(|(key, cells)| cells.iter().map(move |(ts, value)| (key, *ts, value)))
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> usize {
        self.columns.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.last().copied()
    }
}
