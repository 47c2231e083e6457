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

//! Subcommand implementations

use anyhow::{Context, Result};
use carbonwatch_core::{
    AfterMerge, BatchReport, CarbonIntensityClient, DateRange, DownloadOptions, ReshapeOptions,
    SnapshotStore, SummaryOptions, SummaryTable, load_summary, run_download, run_reshape,
    run_summary, store::write_atomic, summary_path,
};
use carbonwatch_report::{
    ChartWindow, CsvFormatter, TableFormatter, fit_errors, forecast_chart_svg, forecast_errors,
    forecast_series, histogram_svg, horizon_stats, pooled_errors,
};
use carbonwatch_types::{
    EARLIEST_DATE, Endpoint, FILENAME_DATETIME_FORMAT, REGION_IDS, parse_api_datetime,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{ChartArgs, DownloadArgs, EndpointArgs, ReshapeArgs, StatsArgs, SummarizeArgs};
use crate::config::AppConfig;

/// Snapshots of each endpoint live in their own directory
pub fn snapshot_store(config: &AppConfig, endpoint: Endpoint) -> SnapshotStore {
    SnapshotStore::new(config.storage.data_dir.join(endpoint.id()))
        .with_archive_dir(config.storage.archive_dir_name.clone())
}

fn check_region(target: &EndpointArgs) -> Result<()> {
    if let Some(region) = target.region
        && !REGION_IDS.contains(&region)
    {
        anyhow::bail!(
            "Region id {region} out of range {}-{}",
            REGION_IDS.start(),
            REGION_IDS.end()
        );
    }
    if target.endpoint.requires_region() && target.region.is_none() {
        anyhow::bail!("Endpoint {} requires --region", target.endpoint);
    }
    Ok(())
}

fn group_of(target: &EndpointArgs) -> Option<String> {
    target.region.map(|region| region.to_string())
}

pub fn download(config: &AppConfig, args: &DownloadArgs) -> Result<BatchReport> {
    check_region(&args.target)?;
    let endpoint = args.target.endpoint;

    let now = Utc::now();
    let (start, end) = if args.now {
        (now, now)
    } else {
        let start = match args.start {
            Some(start) => start,
            None => parse_api_datetime(EARLIEST_DATE)?,
        };
        (start, args.end.unwrap_or(now))
    };
    if end < start {
        anyhow::bail!("--end {end} is before --start {start}");
    }

    let store = snapshot_store(config, endpoint);
    let client = CarbonIntensityClient::new(&config.client_settings())
        .context("Failed to create API client")?;

    let options = DownloadOptions {
        endpoint,
        region: args.target.region,
        start,
        end,
        num_files: if args.now { 1 } else { args.num_files },
        max_retries: config.api.max_retries,
        retry_delay: config.retry_delay(),
    };

    info!(
        "📥 Downloading {endpoint} into {} from {}",
        store.dir().display(),
        client.base_url()
    );
    Ok(run_download(&client, &store, &options)?)
}

pub fn reshape(config: &AppConfig, args: &ReshapeArgs) -> Result<BatchReport> {
    let endpoint = args.target.endpoint;
    let store = snapshot_store(config, endpoint);
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| store.dir().to_path_buf());

    info!(
        "🔄 Reshaping {endpoint} snapshots in {} into {}",
        store.dir().display(),
        output_dir.display()
    );
    let options = ReshapeOptions {
        endpoint,
        output_dir,
        policy: config.processing.duplicate_policy,
        delete_json: args.delete_json,
    };
    Ok(run_reshape(&store, &options)?)
}

pub fn summarize(config: &AppConfig, args: &SummarizeArgs) -> Result<BatchReport> {
    let endpoint = args.target.endpoint;
    let store = snapshot_store(config, endpoint);

    let after_merge = if args.keep {
        AfterMerge::Keep
    } else if args.delete || config.processing.delete_after_merge {
        AfterMerge::Delete
    } else {
        AfterMerge::Archive
    };

    let options = SummaryOptions {
        endpoint,
        summary_dir: summary_dir(config, args.summary_dir.as_deref()),
        range: DateRange {
            start: args.start,
            end: args.end,
        },
        num_files: args.num_files,
        policy: config.processing.duplicate_policy,
        after_merge,
    };

    info!(
        "📊 Summarizing {endpoint} snapshots from {} into {}",
        store.dir().display(),
        options.summary_dir.display()
    );
    Ok(run_summary(&store, &options)?)
}

fn summary_dir(config: &AppConfig, flag: Option<&Path>) -> PathBuf {
    flag.map_or_else(|| config.storage.summary_dir.clone(), Path::to_path_buf)
}

fn load_existing_summary(dir: &Path, endpoint: Endpoint) -> Result<SummaryTable> {
    let path = summary_path(dir, endpoint);
    if !path.exists() {
        anyhow::bail!(
            "No summary at {}; run `carbonwatch summarize --endpoint {endpoint}` first",
            path.display()
        );
    }
    load_summary(&path, endpoint.summary_format())
        .with_context(|| format!("Failed to load {}", path.display()))
}

pub fn stats(config: &AppConfig, args: &StatsArgs) -> Result<()> {
    check_region(&args.target)?;
    let endpoint = args.target.endpoint;
    let summary = load_existing_summary(
        &summary_dir(config, args.summary_dir.as_deref()),
        endpoint,
    )?;
    let group = group_of(&args.target);

    let errors = forecast_errors(summary.table(), group.as_deref());
    let rows = horizon_stats(&errors)?;
    println!("{}", TableFormatter::format_horizon_stats(&rows));

    if let Some(path) = &args.csv {
        CsvFormatter::write_horizon_stats(path, &rows)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("💾 Horizon statistics written to {}", path.display());
    }

    let selected = (!args.horizons.is_empty()).then_some(args.horizons.as_slice());
    let pooled = pooled_errors(&errors, selected);
    let cutoff = args.cutoff.unwrap_or(config.report.outlier_cutoff);
    let lookups = if args.lookup.is_empty() {
        config.report.lookup_values.as_slice()
    } else {
        args.lookup.as_slice()
    };

    let distribution = fit_errors(&pooled, cutoff)?;
    println!("{}", TableFormatter::format_fits(&distribution, lookups));
    Ok(())
}

pub fn chart(config: &AppConfig, args: &ChartArgs) -> Result<Vec<PathBuf>> {
    check_region(&args.target)?;
    let endpoint = args.target.endpoint;
    let summary = load_existing_summary(
        &summary_dir(config, args.summary_dir.as_deref()),
        endpoint,
    )?;
    let table = summary.table();
    let group = group_of(&args.target);
    let chart_dir = args
        .chart_dir
        .clone()
        .unwrap_or_else(|| config.storage.chart_dir.clone());
    std::fs::create_dir_all(&chart_dir)
        .with_context(|| format!("Failed to create {}", chart_dir.display()))?;

    let hours = args.hours.unwrap_or(config.report.window_hours);
    let window = match args.start {
        Some(start) => ChartWindow::starting_at(start, hours),
        None => {
            ChartWindow::latest_complete(table, hours, config.report.incomplete_hours_offset)?
        }
    };
    let (width, height) = (config.report.chart_width, config.report.chart_height);
    let mut written = Vec::new();

    let series = forecast_series(table, group.as_deref(), &args.horizons, window);
    let title = format!(
        "{endpoint}: forecast vs final actual from {}",
        window.start.format("%Y-%m-%d %H:%M")
    );
    let svg = forecast_chart_svg(&series, window, &title, width, height)?;
    let path = chart_dir.join(format!(
        "{}_forecast_{}.svg",
        endpoint.id(),
        window.start.format(FILENAME_DATETIME_FORMAT)
    ));
    write_atomic(&path, svg.as_bytes())?;
    info!("📈 Forecast chart written to {}", path.display());
    written.push(path);

    let errors = forecast_errors(table, group.as_deref());
    let pooled = pooled_errors(&errors, Some(args.horizons.as_slice()));
    let cutoff = config.report.outlier_cutoff;
    let distribution = fit_errors(&pooled, cutoff)?;
    let bins = args.bins.unwrap_or(config.report.histogram_bins);
    let svg = histogram_svg(
        &distribution,
        bins,
        &format!("{endpoint}: forecast errors within ±{cutoff}"),
        width,
        height,
    )?;
    let path = chart_dir.join(format!("{}_errors.svg", endpoint.id()));
    write_atomic(&path, svg.as_bytes())?;
    info!("📈 Error histogram written to {}", path.display());
    written.push(path);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.data_dir = temp.path().join("data");
        config.storage.summary_dir = temp.path().join("summaries");
        config.storage.chart_dir = temp.path().join("charts");
        config
    }

    fn national_snapshot(from_hour: u32, forecast_offset: f64) -> String {
        let points: Vec<String> = (0..96_u32)
            .map(|i| {
                let hour = from_hour + i.div_euclid(2);
                let (day, hour) = (9 + hour.div_euclid(24), hour.rem_euclid(24));
                let minute = if i.rem_euclid(2) == 0 { "00" } else { "30" };
                let actual = if i < 4 {
                    format!("{}", 180 + i)
                } else {
                    "null".to_owned()
                };
                format!(
                    r#"{{"from":"2023-03-{day:02}T{hour:02}:{minute}Z","to":"x","intensity":{{"forecast":{},"actual":{actual},"index":"moderate"}}}}"#,
                    200.0 + forecast_offset + f64::from(i.rem_euclid(7))
                )
            })
            .collect();
        format!(r#"{{"data":[{}]}}"#, points.join(","))
    }

    fn parse(args: &[&str]) -> Commands {
        let mut full = vec!["carbonwatch"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap().command
    }

    #[test]
    fn test_snapshot_store_per_endpoint() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let store = snapshot_store(&config, Endpoint::RegionalPt24h);
        assert_eq!(store.dir(), temp.path().join("data").join("regional_pt24h"));
        assert_eq!(
            store.archive_dir(),
            temp.path().join("data").join("regional_pt24h").join("_archive")
        );
    }

    #[test]
    fn test_one_region_requires_region() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let Commands::Download(args) = parse(&["download", "-e", "one_region_pt24h", "--now"])
        else {
            panic!("expected download");
        };
        assert!(download(&config, &args).is_err());

        let Commands::Download(args) =
            parse(&["download", "-e", "one_region_pt24h", "--region", "19", "--now"])
        else {
            panic!("expected download");
        };
        assert!(download(&config, &args).is_err());
    }

    #[test]
    fn test_stats_without_summary_fails() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let Commands::Stats(args) = parse(&["stats", "-e", "national_fw48h"]) else {
            panic!("expected stats");
        };
        let err = stats(&config, &args).unwrap_err();
        assert!(err.to_string().contains("summarize"));
    }

    #[test]
    fn test_summarize_stats_and_chart() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let store = snapshot_store(&config, Endpoint::NationalFw48h);
        store.ensure_exists().unwrap();

        // Hourly snapshots over four days; each carries 48h of forecasts
        for n in 0..96_u32 {
            let day = 9 + n.div_euclid(24);
            let hour = n.rem_euclid(24);
            let name = format!("2023-03-{day:02}T{hour:02}01Z.json");
            let body = national_snapshot(n, f64::from(n.rem_euclid(5)));
            fs::write(store.dir().join(name), body).unwrap();
        }

        let Commands::Summarize(args) = parse(&["summarize", "-e", "national_fw48h", "--keep"])
        else {
            panic!("expected summarize");
        };
        let report = summarize(&config, &args).unwrap();
        assert_eq!(report.succeeded, 96);
        assert!(report.is_clean());
        assert!(
            summary_path(&config.storage.summary_dir, Endpoint::NationalFw48h).exists()
        );

        let Commands::Stats(args) = parse(&[
            "stats",
            "-e",
            "national_fw48h",
            "--csv",
            temp.path().join("stats.csv").to_str().unwrap(),
        ]) else {
            panic!("expected stats");
        };
        stats(&config, &args).unwrap();
        assert!(temp.path().join("stats.csv").exists());

        let Commands::Chart(args) = parse(&[
            "chart",
            "-e",
            "national_fw48h",
            "--start",
            "2023-03-10T00:00Z",
            "--hours",
            "12",
            "--horizons",
            "1,2",
            "--bins",
            "10",
        ]) else {
            panic!("expected chart");
        };
        let written = chart(&config, &args).unwrap();
        assert_eq!(written.len(), 2);
        for path in written {
            assert!(fs::read_to_string(path).unwrap().starts_with("<svg"));
        }
    }
}
