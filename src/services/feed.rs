// src/services/feed.rs

//! Line status feed client.
//!
//! Fetches the status snapshot and flattens the wire shape into [`LineStatus`]
//! values. Each line on the wire carries a list of status entries; only the
//! leading entry is considered.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, LineStatus};
use crate::utils::http::create_client;

/// Source of line status snapshots.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Fetch one snapshot of all tracked lines.
    async fn fetch(&self) -> Result<Vec<LineStatus>>;
}

/// HTTP client for the line status feed.
pub struct StatusFeed {
    client: Client,
    url: Url,
}

/// Wire shape of one line entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLine {
    name: String,
    #[serde(default)]
    line_statuses: Vec<RawLineStatus>,
    #[serde(default)]
    disruptions: Vec<RawDisruption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLineStatus {
    status_severity_description: String,
    reason: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDisruption {
    description: Option<String>,
}

impl StatusFeed {
    /// Create a feed client with the configured endpoint and timeout.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(&config.user_agent, config.timeout_secs)?,
            url: Url::parse(&config.url)?,
        })
    }
}

#[async_trait]
impl Feed for StatusFeed {
    /// Transport errors, non-2xx responses, and malformed bodies all surface
    /// as errors. There is no retry here; retry policy belongs to the caller.
    async fn fetch(&self) -> Result<Vec<LineStatus>> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::feed(format!("feed returned status {status}")));
        }
        let body = response.text().await?;
        parse_snapshot(&body)
    }
}

/// Parse a feed body into line statuses.
fn parse_snapshot(body: &str) -> Result<Vec<LineStatus>> {
    let raw: Vec<RawLine> =
        serde_json::from_str(body).map_err(|e| AppError::feed(format!("malformed feed body: {e}")))?;
    Ok(raw.into_iter().filter_map(flatten_line).collect())
}

/// Collapse a wire entry to its leading status entry.
fn flatten_line(raw: RawLine) -> Option<LineStatus> {
    let Some(leading) = raw.line_statuses.into_iter().next() else {
        log::debug!("Line {} has no status entries, skipping", raw.name);
        return None;
    };
    if let Some(url) = &leading.url {
        log::debug!("Line {} status references {}", raw.name, url);
    }
    Some(LineStatus {
        name: raw.name,
        status: leading.status_severity_description,
        reason: leading.reason,
        info_url: leading.url,
        disruptions: raw
            .disruptions
            .into_iter()
            .filter_map(|d| d.description)
            .collect(),
    })
}
