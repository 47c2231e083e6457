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

//! CLI argument definitions using clap.

use carbonwatch_types::{Endpoint, Horizon, parse_datetime};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "carbonwatch")]
#[command(author, version, about = "Carbon intensity forecast archiver and analyser")]
#[command(
    long_about = "Collects snapshots of the GB carbon intensity API, folds them into\n\
    per-endpoint summary tables indexed by forecast horizon, and reports how\n\
    forecasts compare with the final actual values.\n\
    \nExamples:\n  \
    carbonwatch download --endpoint national_fw48h --now\n  \
    carbonwatch summarize --endpoint national_fw48h\n  \
    carbonwatch stats --endpoint national_fw48h --csv stats.csv\n  \
    carbonwatch chart --endpoint national_fw48h --horizons 1,6,24"
)]
pub struct Cli {
    /// Path to a TOML configuration file (default: ./carbonwatch.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Root directory of the snapshot store (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch snapshots from the API into the snapshot store
    #[command(
        long_about = "Fetch one snapshot per half hour between --start and --end.\n\
        \nExisting files are never overwritten. The batch stops at the first\n\
        empty response or once a request keeps failing.\n\
        \nExamples:\n  \
        carbonwatch download --endpoint national_fw48h --now\n  \
        carbonwatch download --endpoint national_pt24h --start 2023-03-01 --end 2023-03-02\n  \
        carbonwatch download --endpoint one_region_fw48h --region 13 --num-files 10"
    )]
    Download(DownloadArgs),

    /// Convert each snapshot into a flat CSV table
    Reshape(ReshapeArgs),

    /// Merge snapshots into the endpoint's summary table
    #[command(
        long_about = "Fold every snapshot in the store into summary_<endpoint>.csv.\n\
        \nThe summary is written before any snapshot is archived or deleted,\n\
        so an interrupted run can simply be repeated."
    )]
    Summarize(SummarizeArgs),

    /// Forecast error statistics per horizon and error distribution fits
    Stats(StatsArgs),

    /// Forecast vs actual chart and error histogram as SVG
    Chart(ChartArgs),
}

#[derive(Debug, Clone, Args)]
pub struct EndpointArgs {
    /// Endpoint id, e.g. national_fw48h or regional_pt24h
    #[arg(short, long)]
    pub endpoint: Endpoint,

    /// Region id (1-18); required by one_region endpoints, selects a region
    /// column group in stats and charts
    #[arg(long)]
    pub region: Option<u8>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    /// Fetch a single snapshot for the current time
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub now: bool,

    /// First request time (default: earliest available data)
    #[arg(long, value_parser = parse_datetime)]
    pub start: Option<DateTime<Utc>>,

    /// Last request time (default: now)
    #[arg(long, value_parser = parse_datetime)]
    pub end: Option<DateTime<Utc>>,

    /// Maximum number of requests; 0 means unbounded
    #[arg(long, default_value_t = 0)]
    pub num_files: usize,
}

#[derive(Debug, Args)]
pub struct ReshapeArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    /// Directory for the CSV files (default: next to the snapshots)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Delete each snapshot once its CSV exists
    #[arg(long, default_value_t = false)]
    pub delete_json: bool,
}

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    /// Directory holding summary_<endpoint>.csv
    #[arg(long)]
    pub summary_dir: Option<PathBuf>,

    /// Ignore snapshots captured before this time
    #[arg(long, value_parser = parse_datetime)]
    pub start: Option<DateTime<Utc>>,

    /// Ignore snapshots captured after this time
    #[arg(long, value_parser = parse_datetime)]
    pub end: Option<DateTime<Utc>>,

    /// Maximum number of snapshots merged; 0 means unbounded
    #[arg(long, default_value_t = 0)]
    pub num_files: usize,

    /// Leave merged snapshots in place
    #[arg(long, conflicts_with = "delete")]
    pub keep: bool,

    /// Delete merged snapshots instead of archiving them
    #[arg(long)]
    pub delete: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    #[arg(long)]
    pub summary_dir: Option<PathBuf>,

    /// Horizons (hours) pooled into the distribution fit; all when omitted
    #[arg(long, value_delimiter = ',')]
    pub horizons: Vec<Horizon>,

    /// Also write the per-horizon statistics to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Exclude errors larger than this from distribution fits
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Error magnitudes whose tail probabilities are reported
    #[arg(long, value_delimiter = ',')]
    pub lookup: Vec<f64>,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub target: EndpointArgs,

    #[arg(long)]
    pub summary_dir: Option<PathBuf>,

    #[arg(long)]
    pub chart_dir: Option<PathBuf>,

    /// Forecast horizons (hours) drawn against the final actual
    #[arg(long, value_delimiter = ',', default_value = "1,24")]
    pub horizons: Vec<Horizon>,

    /// Window start (default: the latest window with complete actuals)
    #[arg(long, value_parser = parse_datetime)]
    pub start: Option<DateTime<Utc>>,

    /// Window length in hours
    #[arg(long)]
    pub hours: Option<i64>,

    #[arg(long)]
    pub bins: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download() {
        let cli = Cli::try_parse_from([
            "carbonwatch",
            "--debug",
            "download",
            "--endpoint",
            "one_region_fw48h",
            "--region",
            "13",
            "--start",
            "2023-03-09T20:01Z",
            "--num-files",
            "5",
        ])
        .unwrap();

        assert!(cli.debug);
        let Commands::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.target.endpoint, Endpoint::OneRegionFw48h);
        assert_eq!(args.target.region, Some(13));
        assert_eq!(args.num_files, 5);
        assert!(args.start.is_some());
        assert!(!args.now);
    }

    #[test]
    fn test_now_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "carbonwatch",
            "download",
            "-e",
            "national",
            "--now",
            "--start",
            "2023-03-09",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_stats_horizons() {
        let cli = Cli::try_parse_from([
            "carbonwatch",
            "--log-format",
            "json",
            "stats",
            "-e",
            "national_fw48h",
            "--horizons",
            "0.5,24",
            "--lookup",
            "50,100",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(
            args.horizons,
            vec![Horizon::from_hours(0.5), Horizon::from_hours(24.0)]
        );
        assert_eq!(args.lookup, vec![50.0, 100.0]);
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        assert!(Cli::try_parse_from(["carbonwatch", "reshape", "-e", "weekly"]).is_err());
    }

    #[test]
    fn test_chart_default_horizons() {
        let cli =
            Cli::try_parse_from(["carbonwatch", "chart", "-e", "national_fw48h"]).unwrap();
        let Commands::Chart(args) = cli.command else {
            panic!("expected chart");
        };
        assert_eq!(
            args.horizons,
            vec![Horizon::from_hours(1.0), Horizon::from_hours(24.0)]
        );
    }
}
