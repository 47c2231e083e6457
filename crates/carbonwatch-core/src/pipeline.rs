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

//! Batch pipelines: download, reshape and summarize
//!
//! Each batch processes files strictly in name order and reports how many
//! succeeded, were skipped or failed. Per-file problems are logged and
//! counted; only errors that make the whole batch meaningless propagate.

use carbonwatch_types::{Endpoint, GRID_MINUTES, round_down};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::csv_io::{load_summary, summary_path, write_flat_table, write_summary};
use crate::error::Result;
use crate::fetch::CarbonIntensityClient;
use crate::reshape::{DuplicatePolicy, flat_table};
use crate::snapshot::{Snapshot, read_points};
use crate::store::{SnapshotStore, captured_at_from_path, write_atomic};
use crate::summary::{merge, snapshot_table};

// ============= Reporting =============

/// Why a batch ended before exhausting its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The API answered without data
    NoMoreData,
    /// The configured file limit was reached
    FileLimit,
    /// A request kept failing after all retries
    FetchFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMoreData => f.write_str("no more data"),
            Self::FileLimit => f.write_str("file limit reached"),
            Self::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub stopped: Option<StopReason>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !matches!(self.stopped, Some(StopReason::FetchFailed(_)))
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded, self.skipped, self.failed
        )?;
        if let Some(reason) = &self.stopped {
            write!(f, " (stopped: {reason})")?;
        }
        Ok(())
    }
}

/// Inclusive bounds on snapshot capture times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

// ============= Download =============

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub endpoint: Endpoint,
    pub region: Option<u8>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Maximum number of requests; 0 means unbounded
    pub num_files: usize,
    pub max_retries: u32,
    pub retry_delay: std::time::Duration,
}

/// Request times for a download window.
///
/// Bounds are rounded down to the grid and moved one minute past it, so each
/// returned forecast starts with the half hour the request falls in.
pub fn request_times(start: DateTime<Utc>, end: DateTime<Utc>) -> impl Iterator<Item = DateTime<Utc>> {
    let first = round_down(start) + Duration::minutes(1);
    let last = round_down(end) + Duration::minutes(1);
    std::iter::successors(Some(first), |t| Some(*t + Duration::minutes(GRID_MINUTES)))
        .take_while(move |t| *t <= last)
}

/// Fetch snapshots into the store, one per grid slot.
///
/// Existing files are never overwritten. The batch stops at the first empty
/// response or once a request has failed `max_retries + 1` times.
pub fn run_download(
    client: &CarbonIntensityClient,
    store: &SnapshotStore,
    options: &DownloadOptions,
) -> Result<BatchReport> {
    store.ensure_exists()?;
    let mut report = BatchReport::default();
    let mut requests = 0_usize;

    info!(
        "📥 Downloading {} from {} to {}",
        options.endpoint, options.start, options.end
    );

    for requested_at in request_times(options.start, options.end) {
        if options.num_files > 0 && requests >= options.num_files {
            report.stopped = Some(StopReason::FileLimit);
            break;
        }
        requests += 1;

        let path = store.snapshot_path(requested_at);
        if path.exists() {
            debug!("{} exists, skipping", path.display());
            report.skipped += 1;
            continue;
        }

        match fetch_with_retries(client, options, requested_at) {
            Ok(Some(body)) => {
                let json = serde_json::to_vec_pretty(&body)?;
                write_atomic(&path, &json)?;
                debug!("Saved {}", path.display());
                report.succeeded += 1;
            }
            Ok(None) => {
                info!("No data for {requested_at}, stopping");
                report.stopped = Some(StopReason::NoMoreData);
                break;
            }
            Err(e) => {
                error!("❌ Giving up on {requested_at}: {e}");
                report.failed += 1;
                report.stopped = Some(StopReason::FetchFailed(e.to_string()));
                break;
            }
        }
    }

    info!("✅ Download finished: {report}");
    Ok(report)
}

fn fetch_with_retries(
    client: &CarbonIntensityClient,
    options: &DownloadOptions,
    requested_at: DateTime<Utc>,
) -> Result<Option<serde_json::Value>> {
    let mut attempt = 0_u32;
    loop {
        match client.fetch(options.endpoint, requested_at, options.region) {
            Ok(body) => return Ok(body),
            Err(e) if attempt < options.max_retries => {
                attempt += 1;
                let delay = options.retry_delay.saturating_mul(attempt);
                warn!(
                    "Attempt {attempt}/{} failed: {e}. Retrying in {delay:?}",
                    options.max_retries
                );
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

// ============= Reshape =============

#[derive(Debug, Clone)]
pub struct ReshapeOptions {
    pub endpoint: Endpoint,
    pub output_dir: PathBuf,
    pub policy: DuplicatePolicy,
    /// Remove each JSON file once its CSV exists
    pub delete_json: bool,
}

/// Write a flat CSV next to each snapshot, or into `output_dir`
pub fn run_reshape(store: &SnapshotStore, options: &ReshapeOptions) -> Result<BatchReport> {
    std::fs::create_dir_all(&options.output_dir)?;
    let mut report = BatchReport::default();

    let files = store.list_snapshots()?;
    info!("🔄 Reshaping {} files from {}", files.len(), store.dir().display());

    for json_path in files {
        let csv_path = flat_csv_path(&options.output_dir, &json_path);

        if csv_path.exists() {
            debug!("{} exists, skipping", csv_path.display());
            report.skipped += 1;
        } else {
            match reshape_file(&json_path, &csv_path, options) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!("File skipped: {}: {e}", json_path.display());
                    report.failed += 1;
                    continue;
                }
            }
        }

        if options.delete_json {
            match std::fs::remove_file(&json_path) {
                Ok(()) => debug!("Deleted {}", json_path.display()),
                Err(e) => warn!("Could not delete {}: {e}", json_path.display()),
            }
        }
    }

    info!("✅ Reshape finished: {report}");
    Ok(report)
}

fn flat_csv_path(output_dir: &Path, json_path: &Path) -> PathBuf {
    let stem = json_path.file_stem().unwrap_or_default();
    output_dir.join(stem).with_extension("csv")
}

fn reshape_file(json_path: &Path, csv_path: &Path, options: &ReshapeOptions) -> Result<()> {
    let points = read_points(json_path, options.endpoint.transform())?;
    let captured_at = captured_at_from_path(json_path).unwrap_or_default();
    let table = flat_table(&Snapshot::new(captured_at, points), options.policy)?;
    write_flat_table(csv_path, &table)
}

// ============= Summarize =============

/// What happens to a snapshot once its data is in the persisted summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AfterMerge {
    #[default]
    Archive,
    Delete,
    Keep,
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub endpoint: Endpoint,
    pub summary_dir: PathBuf,
    pub range: DateRange,
    /// Maximum number of snapshots merged; 0 means unbounded
    pub num_files: usize,
    pub policy: DuplicatePolicy,
    pub after_merge: AfterMerge,
}

/// Merge every snapshot in the store into the endpoint's summary.
///
/// Order is merge all, persist, then archive or delete. A snapshot that fails
/// to load is logged, counted and left where it is.
pub fn run_summary(store: &SnapshotStore, options: &SummaryOptions) -> Result<BatchReport> {
    let format = options.endpoint.summary_format();
    std::fs::create_dir_all(&options.summary_dir)?;
    let path = summary_path(&options.summary_dir, options.endpoint);
    let mut summary = load_summary(&path, format)?;
    let mut report = BatchReport::default();
    let mut consumed = Vec::new();

    let files = store.list_snapshots()?;
    info!(
        "📊 Summarizing {} files into {}",
        files.len(),
        path.display()
    );

    for file in files {
        if options.num_files > 0 && report.succeeded >= options.num_files {
            report.stopped = Some(StopReason::FileLimit);
            break;
        }

        let captured_at = match captured_at_from_path(&file) {
            Ok(at) => at,
            Err(e) => {
                warn!("Not a snapshot file: {}: {e}", file.display());
                report.skipped += 1;
                continue;
            }
        };
        if !options.range.contains(captured_at) {
            report.skipped += 1;
            continue;
        }

        let table = Snapshot::load(&file, options.endpoint)
            .and_then(|snapshot| snapshot_table(&snapshot, format, options.policy));
        match table {
            Ok(table) => {
                summary = merge(summary, &table);
                consumed.push(file);
                report.succeeded += 1;
            }
            Err(e) => {
                error!("File skipped: {}: {e}", file.display());
                report.failed += 1;
            }
        }
    }

    if !consumed.is_empty() {
        write_summary(&path, &summary)?;
    }

    for file in &consumed {
        let outcome = match options.after_merge {
            AfterMerge::Archive => store.archive(file).map(|_| ()),
            AfterMerge::Delete => std::fs::remove_file(file).map_err(Into::into),
            AfterMerge::Keep => Ok(()),
        };
        if let Err(e) = outcome {
            warn!("Could not clean up {}: {e}", file.display());
        }
    }

    info!("✅ Summary finished: {report}");
    Ok(report)
}
