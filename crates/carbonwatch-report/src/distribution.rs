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

//! Error-distribution fits and histograms

use statrs::distribution::{Continuous, ContinuousCDF, Laplace, Normal, StudentsT};
use std::fmt;
use tracing::info;

use crate::error::{ReportError, Result};
use crate::stats::as_f64;

/// Degrees of freedom used when the sample has no excess kurtosis
const MAX_DEGREES_OF_FREEDOM: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitKind {
    Normal,
    Laplace,
    StudentT,
}

impl fmt::Display for FitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("Normal"),
            Self::Laplace => f.write_str("Laplace"),
            Self::StudentT => f.write_str("Student's t"),
        }
    }
}

#[derive(Debug, Clone)]
enum Fitted {
    Normal(Normal),
    Laplace(Laplace),
    StudentT(StudentsT),
}

/// A fitted error distribution
#[derive(Debug, Clone)]
pub struct DistributionFit {
    pub kind: FitKind,
    pub location: f64,
    pub scale: f64,
    pub degrees_of_freedom: Option<f64>,
    dist: Fitted,
}

impl DistributionFit {
    pub fn normal(mean: f64, std_dev: f64) -> Result<Self> {
        let dist = Normal::new(mean, std_dev).map_err(|e| ReportError::Fit(e.to_string()))?;
        Ok(Self {
            kind: FitKind::Normal,
            location: mean,
            scale: std_dev,
            degrees_of_freedom: None,
            dist: Fitted::Normal(dist),
        })
    }

    pub fn laplace(location: f64, scale: f64) -> Result<Self> {
        let dist = Laplace::new(location, scale).map_err(|e| ReportError::Fit(e.to_string()))?;
        Ok(Self {
            kind: FitKind::Laplace,
            location,
            scale,
            degrees_of_freedom: None,
            dist: Fitted::Laplace(dist),
        })
    }

    pub fn student_t(location: f64, scale: f64, dof: f64) -> Result<Self> {
        let dist =
            StudentsT::new(location, scale, dof).map_err(|e| ReportError::Fit(e.to_string()))?;
        Ok(Self {
            kind: FitKind::StudentT,
            location,
            scale,
            degrees_of_freedom: Some(dof),
            dist: Fitted::StudentT(dist),
        })
    }

    pub fn pdf(&self, x: f64) -> f64 {
        match &self.dist {
            Fitted::Normal(d) => d.pdf(x),
            Fitted::Laplace(d) => d.pdf(x),
            Fitted::StudentT(d) => d.pdf(x),
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        match &self.dist {
            Fitted::Normal(d) => d.cdf(x),
            Fitted::Laplace(d) => d.cdf(x),
            Fitted::StudentT(d) => d.cdf(x),
        }
    }

    pub fn inverse_cdf(&self, p: f64) -> f64 {
        match &self.dist {
            Fitted::Normal(d) => d.inverse_cdf(p),
            Fitted::Laplace(d) => d.inverse_cdf(p),
            Fitted::StudentT(d) => d.inverse_cdf(p),
        }
    }

    /// Central interval holding 95% of the probability mass
    pub fn interval_95(&self) -> (f64, f64) {
        (self.inverse_cdf(0.025), self.inverse_cdf(0.975))
    }

    /// Probability of an error at least `magnitude` away from zero, either side
    pub fn tail_probability(&self, magnitude: f64) -> f64 {
        let m = magnitude.abs();
        (1.0 - self.cdf(m)) + self.cdf(-m)
    }
}

/// Errors with outliers removed and the fits over them
#[derive(Debug, Clone)]
pub struct ErrorDistribution {
    pub values: Vec<f64>,
    pub excluded: usize,
    pub fits: Vec<DistributionFit>,
}

/// Fit Normal, Laplace and Student's t to the errors within `cutoff` of zero.
///
/// Normal uses the mean and population standard deviation. Laplace uses the
/// median and mean absolute deviation from it. Student's t takes its degrees
/// of freedom from the excess kurtosis (`4 + 6 / k`) and scales so that its
/// variance matches the sample.
pub fn fit_errors(errors: &[f64], cutoff: f64) -> Result<ErrorDistribution> {
    let values: Vec<f64> = errors
        .iter()
        .copied()
        .filter(|e| e.is_finite() && e.abs() <= cutoff)
        .collect();
    let excluded = errors.len() - values.len();
    info!(
        "{excluded} values excluded as outliers or missing, leaving {} data points",
        values.len()
    );

    if values.len() < 2 {
        return Err(ReportError::NotEnoughData(format!(
            "{} errors within the cutoff of {cutoff}",
            values.len()
        )));
    }

    let n = as_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    let std_dev = m2.sqrt();
    if std_dev <= 0.0 {
        return Err(ReportError::Fit("errors have zero spread".to_owned()));
    }

    let median = median(&values);
    let mad = values.iter().map(|v| (v - median).abs()).sum::<f64>() / n;

    let excess_kurtosis = m4 / (m2 * m2) - 3.0;
    let dof = if excess_kurtosis > 0.0 {
        (4.0 + 6.0 / excess_kurtosis).min(MAX_DEGREES_OF_FREEDOM)
    } else {
        MAX_DEGREES_OF_FREEDOM
    };
    let t_scale = std_dev * ((dof - 2.0) / dof).sqrt();

    let fits = vec![
        DistributionFit::normal(mean, std_dev)?,
        DistributionFit::laplace(median, mad.max(f64::EPSILON))?,
        DistributionFit::student_t(mean, t_scale, dof)?,
    ];

    Ok(ErrorDistribution {
        values,
        excluded,
        fits,
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len().div_euclid(2);
    if sorted.len().rem_euclid(2) == 0 {
        sorted
            .get(mid.saturating_sub(1)..=mid)
            .map_or(0.0, |pair| pair.iter().sum::<f64>() / 2.0)
    } else {
        sorted.get(mid).copied().unwrap_or_default()
    }
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Result<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return Err(ReportError::NotEnoughData("empty histogram".to_owned()));
        }

        let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi <= lo {
            lo -= 0.5;
            hi += 0.5;
        }
        let bin_width = (hi - lo) / as_f64(bins);

        let mut counts = vec![0_usize; bins];
        for v in finite {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "value is within [lo, hi] so the index is non-negative and bounded"
            )]
            let index = (((v - lo) / bin_width).floor() as usize).min(bins - 1);
            if let Some(count) = counts.get_mut(index) {
                *count += 1;
            }
        }

        Ok(Self {
            start: lo,
            bin_width,
            counts,
        })
    }

    pub fn end(&self) -> f64 {
        self.start + self.bin_width * as_f64(self.counts.len())
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// (lower edge, upper edge, probability density) per bin
    pub fn density_bins(&self) -> Vec<(f64, f64, f64)> {
        let total = as_f64(self.total()).max(1.0);
        self.counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let lower = self.start + self.bin_width * as_f64(i);
                (
                    lower,
                    lower + self.bin_width,
                    as_f64(*count) / (total * self.bin_width),
                )
            })
            .collect()
    }
}
