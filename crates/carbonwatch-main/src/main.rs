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

mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use carbonwatch_core::BatchReport;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands, LogFormat};
use config::AppConfig;

/// Exit code of a run that completed but skipped or lost some files
const EXIT_PARTIAL: u8 = 2;

fn init_logging(debug: bool, format: LogFormat) -> Result<()> {
    // RUST_LOG wins unless --debug was given
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.context("setting default subscriber failed")
}

fn finish_batch(name: &str, report: &BatchReport) -> ExitCode {
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        warn!("⚠️ {name} finished with problems: {report}");
        ExitCode::from(EXIT_PARTIAL)
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir.clone_from(dir);
    }

    match &cli.command {
        Commands::Download(args) => {
            let report = commands::download(&config, args)?;
            Ok(finish_batch("Download", &report))
        }
        Commands::Reshape(args) => {
            let report = commands::reshape(&config, args)?;
            Ok(finish_batch("Reshape", &report))
        }
        Commands::Summarize(args) => {
            let report = commands::summarize(&config, args)?;
            Ok(finish_batch("Summarize", &report))
        }
        Commands::Stats(args) => {
            commands::stats(&config, args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Chart(args) => {
            let written = commands::chart(&config, args)?;
            info!("✅ Chart finished: {} files written", written.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.log_format)?;

    match run(&cli) {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("❌ {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}
