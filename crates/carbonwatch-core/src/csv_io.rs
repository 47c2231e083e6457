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

//! CSV layout of summary and flat tables
//!
//! Summary files carry one header row per [`HeaderLevel`] of their format. The
//! first cell of each header row names the level; the remaining cells hold
//! that level's part of each column key. Data rows start with the timestamp
//! in API format. Empty fields are missing cells.
//!
//! ```text
//! dimension,intensity.actual,intensity.forecast,intensity.forecast
//! horizon,-000.5,+000.0,+000.5
//! 2023-03-09T20:00Z,,186,
//! ```

use carbonwatch_types::{
    CellValue, Endpoint, HeaderLevel, Horizon, SummaryFormat, format_api_datetime,
    parse_api_datetime,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::store::temp_sibling;
use crate::summary::SummaryTable;
use crate::table::{ColumnKey, WideTable};

/// Index column name of flat tables
pub const FLAT_INDEX: &str = "from";

const SUMMARY_PREFIX: &str = "summary_";

/// `summary_<endpoint>.csv` inside `dir`
pub fn summary_path(dir: &Path, endpoint: Endpoint) -> PathBuf {
    dir.join(format!("{SUMMARY_PREFIX}{}.csv", endpoint.id()))
}

/// Endpoint a summary file belongs to, from its name
pub fn endpoint_from_summary_path(path: &Path) -> Result<Endpoint> {
    let stem = path
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or_default();
    stem.strip_prefix(SUMMARY_PREFIX)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| CoreError::UnknownEndpoint(path.display().to_string()))
}

fn level_value(key: &ColumnKey, level: HeaderLevel) -> String {
    match level {
        HeaderLevel::Dimension => key.dimension.clone(),
        HeaderLevel::Region => key.group.clone().unwrap_or_default(),
        HeaderLevel::Horizon => key.horizon.map(|h| h.to_string()).unwrap_or_default(),
    }
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    table: &WideTable,
    header: &[(String, Vec<String>)],
) -> Result<()> {
    for (first, cells) in header {
        writer.write_record(std::iter::once(first).chain(cells))?;
    }

    let columns: Vec<&ColumnKey> = table.columns().collect();
    for timestamp in table.row_index() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(format_api_datetime(timestamp));
        record.extend(columns.iter().map(|key| {
            table
                .get(timestamp, key)
                .map(ToString::to_string)
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }
    Ok(())
}

/// Write through a temporary sibling file and rename over `path`
fn write_csv_atomic(path: &Path, table: &WideTable, header: &[(String, Vec<String>)]) -> Result<()> {
    let temp_path = temp_sibling(path);
    {
        let mut writer = csv::Writer::from_path(&temp_path)?;
        write_rows(&mut writer, table, header)?;
        writer.flush()?;
    }
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Persist a summary table atomically
pub fn write_summary(path: &Path, summary: &SummaryTable) -> Result<()> {
    let table = summary.table();
    let header: Vec<(String, Vec<String>)> = summary
        .format()
        .header_levels()
        .iter()
        .map(|level| {
            let cells = table.columns().map(|key| level_value(key, *level)).collect();
            (level.name().to_owned(), cells)
        })
        .collect();

    write_csv_atomic(path, table, &header)?;
    info!(
        "Saved summary {} ({} rows, {} columns)",
        path.display(),
        table.n_rows(),
        table.n_columns()
    );
    Ok(())
}

/// Load a summary table; a missing file is an empty summary
pub fn load_summary(path: &Path, format: SummaryFormat) -> Result<SummaryTable> {
    if !path.exists() {
        info!("No summary at {}, starting empty", path.display());
        return Ok(SummaryTable::empty(format));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut records = reader.records();
    let levels = format.header_levels();

    let mut header_rows = Vec::with_capacity(levels.len());
    for level in levels {
        let record = records.next().transpose()?.ok_or_else(|| {
            CoreError::SummaryFormat(format!(
                "{}: missing '{}' header row",
                path.display(),
                level.name()
            ))
        })?;
        let first = record.get(0).unwrap_or_default();
        if first != level.name() {
            return Err(CoreError::SummaryFormat(format!(
                "{}: expected '{}' header row, found '{first}'",
                path.display(),
                level.name()
            )));
        }
        header_rows.push(record);
    }

    let n_columns = header_rows
        .first()
        .map_or(0, |record| record.len().saturating_sub(1));
    let mut keys = Vec::with_capacity(n_columns);
    let mut unique = BTreeSet::new();
    for column in 1..=n_columns {
        let mut key = ColumnKey::new(String::new(), None, None);
        for (level, record) in levels.iter().zip(&header_rows) {
            let cell = record.get(column).unwrap_or_default().trim();
            match level {
                HeaderLevel::Dimension => cell.clone_into(&mut key.dimension),
                HeaderLevel::Region => {
                    key.group = (!cell.is_empty()).then(|| cell.to_owned());
                }
                HeaderLevel::Horizon => {
                    let horizon: Horizon = cell.parse().map_err(|e: anyhow::Error| {
                        CoreError::SummaryFormat(format!("{}: {e}", path.display()))
                    })?;
                    key.horizon = Some(horizon);
                }
            }
        }
        if !unique.insert(key.clone()) {
            return Err(CoreError::SummaryFormat(format!(
                "{}: duplicate column {key}",
                path.display()
            )));
        }
        keys.push(key);
    }

    let mut table = WideTable::new();
    for key in &keys {
        table.insert_column(key.clone());
    }
    for record in records {
        let record = record?;
        let raw = record.get(0).unwrap_or_default();
        let timestamp = parse_api_datetime(raw)
            .map_err(|e| CoreError::SummaryFormat(format!("{}: {e}", path.display())))?;
        table.insert_row(timestamp);
        for (key, field) in keys.iter().zip(record.iter().skip(1)) {
            if let Some(value) = CellValue::from_field(field) {
                table.set(timestamp, key.clone(), value);
            }
        }
    }

    debug!(
        "Loaded summary {} ({} rows, {} columns)",
        path.display(),
        table.n_rows(),
        table.n_columns()
    );
    Ok(SummaryTable::from_table(format, table))
}

/// Write one snapshot's flat table.
///
/// The first header row holds the dimensions under `from`; regional tables get
/// a second `region` row.
pub fn write_flat_table(path: &Path, table: &WideTable) -> Result<()> {
    let mut header = vec![(
        FLAT_INDEX.to_owned(),
        table.columns().map(|k| k.dimension.clone()).collect(),
    )];
    if table.columns().any(|k| k.group.is_some()) {
        header.push((
            HeaderLevel::Region.name().to_owned(),
            table
                .columns()
                .map(|k| k.group.clone().unwrap_or_default())
                .collect(),
        ));
    }
    write_csv_atomic(path, table, &header)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
