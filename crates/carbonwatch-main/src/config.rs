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

use anyhow::{Context, Result};
use carbonwatch_core::{ClientSettings, DEFAULT_BASE_URL, DuplicatePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "carbonwatch.toml";

pub const ENV_BASE_URL: &str = "CARBONWATCH_BASE_URL";
pub const ENV_DATA_DIR: &str = "CARBONWATCH_DATA_DIR";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Carbon intensity API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra attempts after a failed request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; later retries wait proportionally longer
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    carbonwatch_core::fetch::DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    carbonwatch_core::fetch::DEFAULT_USER_AGENT.to_owned()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Where snapshots, summaries and charts live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshots are kept under `<data_dir>/<endpoint>/`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_summary_dir")]
    pub summary_dir: PathBuf,

    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,

    #[serde(default = "default_archive_dir_name")]
    pub archive_dir_name: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_summary_dir() -> PathBuf {
    PathBuf::from("summaries")
}

fn default_chart_dir() -> PathBuf {
    PathBuf::from("charts")
}

fn default_archive_dir_name() -> String {
    carbonwatch_core::store::DEFAULT_ARCHIVE_DIR.to_owned()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            summary_dir: default_summary_dir(),
            chart_dir: default_chart_dir(),
            archive_dir_name: default_archive_dir_name(),
        }
    }
}

/// Reshape and summarize behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Delete merged snapshots instead of archiving them
    #[serde(default)]
    pub delete_after_merge: bool,
}

/// Statistics and chart parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Errors larger than this (gCO2/kWh) are excluded from distribution fits
    #[serde(default = "default_outlier_cutoff")]
    pub outlier_cutoff: f64,

    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    /// Error magnitudes whose tail probabilities are reported
    #[serde(default = "default_lookup_values")]
    pub lookup_values: Vec<f64>,

    #[serde(default = "default_incomplete_hours_offset")]
    pub incomplete_hours_offset: i64,

    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_outlier_cutoff() -> f64 {
    200.0
}

fn default_histogram_bins() -> usize {
    100
}

fn default_lookup_values() -> Vec<f64> {
    vec![50.0, 100.0]
}

fn default_incomplete_hours_offset() -> i64 {
    carbonwatch_report::DEFAULT_INCOMPLETE_HOURS_OFFSET
}

fn default_window_hours() -> i64 {
    carbonwatch_report::DEFAULT_WINDOW_HOURS
}

fn default_chart_width() -> u32 {
    1200
}

fn default_chart_height() -> u32 {
    600
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            outlier_cutoff: default_outlier_cutoff(),
            histogram_bins: default_histogram_bins(),
            lookup_values: default_lookup_values(),
            incomplete_hours_offset: default_incomplete_hours_offset(),
            window_hours: default_window_hours(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, else `carbonwatch.toml` in the working directory,
    /// else defaults. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("✅ Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CARBONWATCH_*` overrides; `lookup` reads one variable
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than 0");
        }
        if self.storage.archive_dir_name.trim().is_empty() {
            anyhow::bail!("storage.archive_dir_name must not be empty");
        }
        if self.report.histogram_bins == 0 {
            anyhow::bail!("report.histogram_bins must be greater than 0");
        }
        if !(self.report.outlier_cutoff.is_finite() && self.report.outlier_cutoff > 0.0) {
            anyhow::bail!(
                "report.outlier_cutoff must be a positive number, got {}",
                self.report.outlier_cutoff
            );
        }
        if self.report.lookup_values.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("report.lookup_values must be finite numbers");
        }
        if self.report.incomplete_hours_offset < 0 {
            anyhow::bail!("report.incomplete_hours_offset must not be negative");
        }
        if self.report.window_hours <= 0 {
            anyhow::bail!("report.window_hours must be greater than 0");
        }
        if self.report.chart_width == 0 || self.report.chart_height == 0 {
            anyhow::bail!(
                "report chart size must be non-zero, got {}x{}",
                self.report.chart_width,
                self.report.chart_height
            );
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            user_agent: self.api.user_agent.clone(),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.api.retry_delay_secs)
    }
}
