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

//! Blocking client for the GB carbon-intensity API

use carbonwatch_types::Endpoint;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::snapshot::extract_points;

pub const DEFAULT_BASE_URL: &str = "https://api.carbonintensity.org.uk";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("carbonwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

#[derive(Debug)]
pub struct CarbonIntensityClient {
    client: Client,
    base_url: String,
}

impl CarbonIntensityClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|e| CoreError::Fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one snapshot.
    ///
    /// Returns `Ok(None)` when the API answers successfully but without data,
    /// which marks the end of what it can serve.
    pub fn fetch(
        &self,
        endpoint: Endpoint,
        from: DateTime<Utc>,
        region: Option<u8>,
    ) -> Result<Option<Value>> {
        let url = endpoint
            .url(&self.base_url, from, region)
            .map_err(|e| CoreError::InvalidRequest(e.to_string()))?;

        info!("Getting data for {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| CoreError::Fetch(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Fetch(format!("HTTP {status} from {url}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !content_type.contains("application/json") {
            return Err(CoreError::Fetch(format!(
                "Unexpected content type '{content_type}' from {url}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| CoreError::Fetch(format!("Failed to read response from {url}: {e}")))?;
        let body: Value = serde_json::from_slice(&bytes)?;

        if is_empty_payload(&body) {
            debug!("Empty payload from {}", url);
            return Ok(None);
        }

        // Reject documents the reshaper couldn't read later
        extract_points(endpoint.transform(), &bytes).map_err(|e| {
            CoreError::Fetch(format!("Unexpected payload structure from {url}: {e}"))
        })?;

        Ok(Some(body))
    }
}

/// A successful response that carries no data
fn is_empty_payload(body: &Value) -> bool {
    match body.get("data") {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(fields)) => fields.is_empty(),
        Some(Value::Bool(_) | Value::Number(_) | Value::String(_)) => false,
    }
}
