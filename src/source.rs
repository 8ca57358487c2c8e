//! Resolution and loading of realtime feeds.
//!
//! Both feeds follow the same policy: an existing local file wins, otherwise
//! a configured URL is fetched, otherwise the feed is absent. Any failure while
//! reading, fetching or decoding also counts as absent.

use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Local(PathBuf),
    Remote(String),
    Absent,
}

impl FeedSource {
    /// Picks the local file when it exists, else the URL, else nothing.
    pub fn resolve(local: Option<&Path>, url: Option<&str>) -> Self {
        if let Some(path) = local.filter(|p| p.exists()) {
            return FeedSource::Local(path.to_path_buf());
        }
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => FeedSource::Remote(url.to_string()),
            None => FeedSource::Absent,
        }
    }

    /// Treats anything starting with `http` as a URL and the rest as a path.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http") {
            FeedSource::Remote(location.to_string())
        } else {
            FeedSource::Local(PathBuf::from(location))
        }
    }

    /// Reads and decodes the feed. `Ok(None)` means no source was configured.
    ///
    /// Remote fetches are abandoned once `timeout` elapses.
    pub async fn fetch<C: HttpClient>(
        &self,
        client: &C,
        timeout: Duration,
    ) -> Result<Option<FeedMessage>> {
        let bytes = match self {
            FeedSource::Local(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read '{}'", path.display()))?,
            FeedSource::Remote(url) => tokio::time::timeout(timeout, fetch_bytes(client, url))
                .await
                .map_err(|_| anyhow!("fetch of '{url}' timed out after {timeout:?}"))??,
            FeedSource::Absent => return Ok(None),
        };

        parse_feed(&bytes).map(Some)
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Local(path) => write!(f, "file {}", path.display()),
            FeedSource::Remote(url) => write!(f, "url {url}"),
            FeedSource::Absent => f.write_str("none"),
        }
    }
}

/// Loads one named feed, logging and swallowing every failure.
#[tracing::instrument(skip(client, timeout), fields(source = %source))]
pub async fn load_feed<C: HttpClient>(
    feed: &str,
    source: &FeedSource,
    client: &C,
    timeout: Duration,
) -> Option<FeedMessage> {
    match source.fetch(client, timeout).await {
        Ok(Some(message)) => {
            info!(entity_count = message.entity.len(), "Realtime feed loaded");
            Some(message)
        }
        Ok(None) => {
            warn!("No source configured for realtime feed");
            None
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(error = %message, "Realtime feed unavailable");
            None
        }
    }
}
