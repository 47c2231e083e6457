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

//! Output formatters for forecast accuracy reports.

use comfy_table::{Attribute, Cell, CellAlignment, Table, presets::UTF8_FULL};
use std::path::Path;

use crate::distribution::ErrorDistribution;
use crate::error::Result;
use crate::stats::HorizonStats;

/// Formatter for terminal tables
pub struct TableFormatter;

/// Formatter for CSV export
pub struct CsvFormatter;

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

fn interval(ci: Option<(f64, f64)>) -> String {
    ci.map_or_else(|| "-".to_owned(), |(lo, hi)| format!("{lo:.2} .. {hi:.2}"))
}

impl TableFormatter {
    /// Per-horizon error statistics
    pub fn format_horizon_stats(rows: &[HorizonStats]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&[
            "Horizon\n(h)",
            "Count",
            "Mean",
            "Std Dev",
            "Min",
            "Max",
            "95% CI",
            "99% CI",
        ]));

        for row in rows {
            table.add_row(vec![
                Cell::new(row.horizon.to_string()),
                Cell::new(row.stats.count).set_alignment(CellAlignment::Right),
                number(row.stats.mean),
                number(row.stats.std_dev),
                number(row.stats.min),
                number(row.stats.max),
                Cell::new(interval(row.ci95)),
                Cell::new(interval(row.ci99)),
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        output.push_str(&format!("{} horizons\n", rows.len()));
        output
    }

    /// Fitted distributions with their 95% intervals and tail probabilities
    /// for each lookup magnitude
    pub fn format_fits(distribution: &ErrorDistribution, lookups: &[f64]) -> String {
        let mut names = vec![
            "Distribution".to_owned(),
            "Location".to_owned(),
            "Scale".to_owned(),
            "95% interval".to_owned(),
        ];
        names.extend(lookups.iter().map(|m| format!("P(|e| > {m})")));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(header(&names.iter().map(String::as_str).collect::<Vec<_>>()));

        for fit in &distribution.fits {
            let name = match fit.degrees_of_freedom {
                Some(dof) => format!("{} (dof {dof:.1})", fit.kind),
                None => fit.kind.to_string(),
            };
            let (lo, hi) = fit.interval_95();
            let mut row = vec![
                Cell::new(name),
                number(fit.location),
                number(fit.scale),
                Cell::new(format!("{lo:.2} .. {hi:.2}")),
            ];
            row.extend(
                lookups
                    .iter()
                    .map(|m| Cell::new(format!("{:.4}", fit.tail_probability(*m)))),
            );
            table.add_row(row);
        }

        let mut output = table.to_string();
        output.push('\n');
        output.push_str(&format!(
            "{} errors fitted, {} excluded\n",
            distribution.values.len(),
            distribution.excluded
        ));
        output
    }
}

impl CsvFormatter {
    /// Write per-horizon statistics; missing intervals are empty fields
    pub fn write_horizon_stats(path: &Path, rows: &[HorizonStats]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "horizon", "count", "mean", "std_dev", "min", "max", "ci95_low", "ci95_high",
            "ci99_low", "ci99_high",
        ])?;

        let bound = |ci: Option<(f64, f64)>, pick: fn((f64, f64)) -> f64| {
            ci.map(|pair| pick(pair).to_string()).unwrap_or_default()
        };

        for row in rows {
            writer.write_record([
                row.horizon.to_string(),
                row.stats.count.to_string(),
                row.stats.mean.to_string(),
                row.stats.std_dev.to_string(),
                row.stats.min.to_string(),
                row.stats.max.to_string(),
                bound(row.ci95, |(lo, _)| lo),
                bound(row.ci95, |(_, hi)| hi),
                bound(row.ci99, |(lo, _)| lo),
                bound(row.ci99, |(_, hi)| hi),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
