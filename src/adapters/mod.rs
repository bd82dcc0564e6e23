//! Adapter interfaces for external systems.
//!
//! The library core only sees the [`Downloader`] trait and the feed
//! parsing contract; the HTTP implementations live here.

pub mod feed;
pub mod http;

use std::path::PathBuf;

use async_trait::async_trait;

pub use feed::{fetch_feed, parse_feed, FeedError};
pub use http::{DownloaderConfig, HttpDownloader};

/// One transfer: fetch `url` into `destination`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub destination: PathBuf,
}

impl DownloadItem {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }
}

/// Per-item result of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File was fetched and written
    Downloaded,

    /// Destination already existed and overwrite was off
    Skipped,

    /// Transfer failed; nothing was left at the destination
    Failed(String),
}

impl DownloadOutcome {
    /// Downloaded or skipped
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: String,
    pub destination: PathBuf,
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn new(item: DownloadItem, outcome: DownloadOutcome) -> Self {
        Self {
            url: item.url,
            destination: item.destination,
            outcome,
        }
    }
}

/// Aggregate of a batch of transfers
#[derive(Debug, Clone, Default)]
pub struct DownloadSummary {
    pub requested: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<DownloadResult>,
}

impl DownloadSummary {
    /// Build the counts from per-item results
    pub fn from_results(results: Vec<DownloadResult>) -> Self {
        let mut summary = Self {
            requested: results.len(),
            ..Self::default()
        };

        for result in &results {
            match result.outcome {
                DownloadOutcome::Downloaded => summary.successful += 1,
                DownloadOutcome::Skipped => summary.skipped += 1,
                DownloadOutcome::Failed(_) => summary.failed += 1,
            }
        }

        summary.results = results;
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Trait for download backends
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable downloader name
    fn name(&self) -> &str;

    /// Run a batch of transfers. Never fails as a whole: every item gets an
    /// outcome in the returned summary.
    async fn download(&self, items: Vec<DownloadItem>) -> DownloadSummary;
}
