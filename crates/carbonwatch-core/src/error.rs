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

//! Error types for the core crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    #[error("summary format error: {0}")]
    SummaryFormat(String),

    #[error("duplicate cell at {timestamp} in column {column}")]
    DuplicateCell { timestamp: String, column: String },

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
