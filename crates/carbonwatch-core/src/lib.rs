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

//! CarbonWatch core: snapshot store, horizon normalizer, reshaper, summary
//! accumulator, CSV persistence and the API client.

pub mod csv_io;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod reshape;
pub mod snapshot;
pub mod store;
pub mod summary;
pub mod table;

pub use csv_io::{
    endpoint_from_summary_path, load_summary, summary_path, write_flat_table, write_summary,
};
pub use error::{CoreError, Result};
pub use fetch::{CarbonIntensityClient, ClientSettings, DEFAULT_BASE_URL};
pub use normalize::{Observation, normalize};
pub use pipeline::{
    AfterMerge, BatchReport, DateRange, DownloadOptions, ReshapeOptions, StopReason,
    SummaryOptions, request_times, run_download, run_reshape, run_summary,
};
pub use reshape::{DuplicatePolicy, Shape, flat_table, pivot};
pub use snapshot::{DataPoint, Snapshot, extract_points, read_points};
pub use store::{SnapshotStore, captured_at_from_path, snapshot_file_name};
pub use summary::{SummaryTable, merge, snapshot_table};
pub use table::{ColumnKey, WideTable};
